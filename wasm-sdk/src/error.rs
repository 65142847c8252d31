//! Error conversion utilities for WASM.

use dapp_wallet_core::Error;
use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;

/// Convert a core error into a JS `Error` carrying a `kind` tag.
///
/// The message is the error's display text, so provider messages reach the
/// UI verbatim.
pub fn to_js_error(err: Error) -> JsValue {
    let js_err = js_sys::Error::new(&err.to_string());
    let _ = Reflect::set(&js_err, &"kind".into(), &JsValue::from_str(err.kind()));
    if let Error::Provider {
        code: Some(code), ..
    } = &err
    {
        let _ = Reflect::set(&js_err, &"code".into(), &JsValue::from_f64(*code as f64));
    }
    js_err.into()
}

/// Map a rejected EIP-1193 request onto the core taxonomy.
///
/// Wallets reject with `{ code, message }`. When the outer object has no
/// `code`, the one nested under `data.originalError` is used instead.
pub fn from_rpc_error(value: &JsValue, chain_id: Option<u64>) -> Error {
    let code = rpc_code(value).or_else(|| {
        get(value, "data")
            .and_then(|data| get(&data, "originalError"))
            .and_then(|original| rpc_code(&original))
    });
    let message = get(value, "message")
        .and_then(|m| m.as_string())
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value));
    Error::from_rpc(code, message, chain_id)
}

/// Failure calling into JS before any request reached the wallet.
pub fn js_call_error(context: &str, value: &JsValue) -> Error {
    let message = get(value, "message")
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", value));
    Error::Other(format!("{}: {}", context, message))
}

fn rpc_code(value: &JsValue) -> Option<i64> {
    get(value, "code")
        .and_then(|c| c.as_f64())
        .map(|c| c as i64)
}

fn get(value: &JsValue, key: &str) -> Option<JsValue> {
    if !value.is_object() {
        return None;
    }
    Reflect::get(value, &JsValue::from_str(key))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

/// Build a plain object from key/value pairs.
pub(crate) fn object(entries: &[(&str, JsValue)]) -> Result<Object, Error> {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &JsValue::from_str(key), value)
            .map_err(|e| js_call_error("Failed to build request object", &e))?;
    }
    Ok(object)
}

/// Macro to convert core results into JS errors.
#[macro_export]
macro_rules! map_err_to_js {
    ($expr:expr) => {
        $expr.map_err($crate::error::to_js_error)
    };
}
