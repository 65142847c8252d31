//! Browser tests for the JS bridge.
//!
//! Run with: wasm-pack test --headless --chrome wasm-sdk

#![cfg(target_arch = "wasm32")]

use dapp_wallet_core::Error;
use dapp_wallet_wasm_sdk::{JsEip1193Provider, WalletClient, from_rpc_error, to_js_error};
use js_sys::{Function, Object, Reflect};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn rpc_error(code: f64, message: &str) -> JsValue {
    let err = Object::new();
    Reflect::set(&err, &"code".into(), &JsValue::from_f64(code)).unwrap();
    Reflect::set(&err, &"message".into(), &JsValue::from_str(message)).unwrap();
    err.into()
}

#[wasm_bindgen_test]
fn test_rpc_errors_map_onto_taxonomy() {
    assert!(matches!(
        from_rpc_error(&rpc_error(4001.0, "User rejected the request."), None),
        Error::UserRejected(_)
    ));
    assert!(matches!(
        from_rpc_error(&rpc_error(4902.0, "Unrecognized chain ID"), Some(80001)),
        Error::ChainUnknownToProvider(80001)
    ));

    let err = from_rpc_error(&rpc_error(-32000.0, "insufficient funds"), None);
    assert_eq!(err.to_string(), "insufficient funds");
}

fn wrapped(outer: JsValue, original: JsValue) -> JsValue {
    let data = Object::new();
    Reflect::set(&data, &"originalError".into(), &original).unwrap();
    Reflect::set(&outer, &"data".into(), &data).unwrap();
    outer
}

#[wasm_bindgen_test]
fn test_outer_code_takes_precedence() {
    let err = wrapped(
        rpc_error(-32603.0, "Internal error"),
        rpc_error(4902.0, "Unrecognized chain ID"),
    );

    assert!(matches!(
        from_rpc_error(&err, Some(137)),
        Error::Provider { code: Some(-32603), .. }
    ));
}

#[wasm_bindgen_test]
fn test_nested_code_used_without_outer_code() {
    let outer = Object::new();
    Reflect::set(&outer, &"message".into(), &JsValue::from_str("Unrecognized chain")).unwrap();
    let err = wrapped(outer.into(), rpc_error(4902.0, "Unrecognized chain ID"));

    assert!(matches!(
        from_rpc_error(&err, Some(137)),
        Error::ChainUnknownToProvider(137)
    ));
}

#[wasm_bindgen_test]
fn test_same_listener_function_registers_once() {
    let calls = Rc::new(Cell::new(0u32));
    let counter = calls.clone();
    let callback = Closure::<dyn FnMut(JsValue)>::new(move |_state: JsValue| {
        counter.set(counter.get() + 1);
    });
    let function: Function = callback.as_ref().unchecked_ref::<Function>().clone();

    let client = WalletClient::new(JsValue::UNDEFINED, None, None).unwrap();
    let detach = client.add_listener(function.clone());
    let detach_again = client.add_listener(function);

    client.disconnect();
    assert_eq!(calls.get(), 1);

    detach.unchecked_ref::<Function>().call0(&JsValue::NULL).unwrap();
    detach_again.unchecked_ref::<Function>().call0(&JsValue::NULL).unwrap();
    client.disconnect();
    assert_eq!(calls.get(), 1);
}

#[wasm_bindgen_test]
fn test_js_error_carries_kind() {
    let err = to_js_error(Error::NotConnected);
    let kind = Reflect::get(&err, &"kind".into()).unwrap();
    assert_eq!(kind.as_string().as_deref(), Some("not_connected"));
}

#[wasm_bindgen_test]
fn test_provider_requires_request_method() {
    assert!(matches!(
        JsEip1193Provider::new(Object::new().into()),
        Err(Error::ProviderUnavailable(_))
    ));
}

#[wasm_bindgen_test]
fn test_format_address() {
    assert_eq!(
        dapp_wallet_wasm_sdk::format_address("0x1234567890abcdef1234567890abcdef12345678"),
        "0x1234...5678"
    );
}
