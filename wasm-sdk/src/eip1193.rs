//! EIP-1193 provider adapter for WASM.
//!
//! Bridges a JavaScript provider object (`window.ethereum`, a WalletConnect
//! `EthereumProvider`, the Coinbase Wallet provider, ...) to the core
//! `WalletProvider` trait. Every JS-side failure is mapped onto the core error
//! taxonomy before it leaves this module.

use crate::error::{from_rpc_error, js_call_error, object};
use dapp_wallet_core::events::EIP1193_EVENTS;
use dapp_wallet_core::network::{parse_chain_id, to_hex_chain_id};
use dapp_wallet_core::{
    AddChainParams, Error, EventHandler, ProviderFuture, Result, TransactionReceipt,
    TransactionRequest, WalletEvent, WalletProvider,
};
use js_sys::{Array, Function, Promise, Reflect};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// Delay between receipt polls in `wait_for_transaction`.
const RECEIPT_POLL_INTERVAL_MS: i32 = 2_000;

type EventClosure = Closure<dyn FnMut(JsValue)>;

/// Adapter over a JS object exposing `request`, `on` and `removeListener`.
pub struct JsEip1193Provider {
    inner: JsValue,
    /// Closures registered with `on`, kept alive until `unsubscribe`.
    subscriptions: RefCell<Vec<(&'static str, EventClosure)>>,
}

impl JsEip1193Provider {
    /// Wrap `inner`, failing if it has no `request` function.
    pub fn new(inner: JsValue) -> Result<Self> {
        if method(&inner, "request").is_none() {
            return Err(Error::ProviderUnavailable(
                "Object is not an EIP-1193 provider (no request method)".to_string(),
            ));
        }
        Ok(Self {
            inner,
            subscriptions: RefCell::new(Vec::new()),
        })
    }

    pub fn inner(&self) -> &JsValue {
        &self.inner
    }

    /// Send a JSON-RPC request through `provider.request({ method, params })`.
    ///
    /// `chain_id` is the chain a switch targets, used to recognize 4902.
    pub async fn request(
        &self,
        rpc_method: &str,
        params: Option<JsValue>,
        chain_id: Option<u64>,
    ) -> Result<JsValue> {
        let mut entries = vec![("method", JsValue::from_str(rpc_method))];
        if let Some(params) = params {
            entries.push(("params", params));
        }
        let args = object(&entries)?;

        let request = method(&self.inner, "request").ok_or_else(|| {
            Error::ProviderUnavailable("Provider lost its request method".to_string())
        })?;

        let promise: Promise = request
            .call1(&self.inner, &args)
            .map_err(|e| from_rpc_error(&e, chain_id))?
            .dyn_into()
            .map_err(|_| Error::Other(format!("Expected Promise from {}", rpc_method)))?;

        JsFuture::from(promise)
            .await
            .map_err(|e| from_rpc_error(&e, chain_id))
    }

    async fn request_as<T: for<'de> Deserialize<'de>>(
        &self,
        rpc_method: &str,
        params: Option<JsValue>,
    ) -> Result<T> {
        let value = self.request(rpc_method, params, None).await?;
        serde_wasm_bindgen::from_value(value).map_err(|e| {
            Error::Parse(format!("Unexpected {} response: {}", rpc_method, e))
        })
    }

    async fn receipt(&self, hash: &str) -> Result<Option<RpcReceipt>> {
        let params = params(&[hash])?;
        self.request_as("eth_getTransactionReceipt", Some(params))
            .await
    }

    async fn block_number(&self) -> Result<u64> {
        let head: String = self.request_as("eth_blockNumber", None).await?;
        parse_quantity(&head)
    }
}

impl WalletProvider for JsEip1193Provider {
    fn request_accounts(&self) -> ProviderFuture<'_, Vec<String>> {
        Box::pin(async move { self.request_as("eth_requestAccounts", None).await })
    }

    fn chain_id(&self) -> ProviderFuture<'_, u64> {
        Box::pin(async move {
            let value: serde_json::Value = self.request_as("eth_chainId", None).await?;
            parse_chain_id(&value)
        })
    }

    fn switch_chain(&self, chain_id: u64) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            let params = params(&[SwitchChain {
                chain_id: to_hex_chain_id(chain_id),
            }])?;
            self.request("wallet_switchEthereumChain", Some(params), Some(chain_id))
                .await?;
            Ok(())
        })
    }

    fn add_chain<'a>(&'a self, chain: &'a AddChainParams) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let params = params(&[chain])?;
            self.request("wallet_addEthereumChain", Some(params), None)
                .await?;
            Ok(())
        })
    }

    fn send_transaction<'a>(&'a self, tx: &'a TransactionRequest) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            let params = params(&[tx])?;
            self.request_as("eth_sendTransaction", Some(params)).await
        })
    }

    fn wait_for_transaction<'a>(
        &'a self,
        hash: &'a str,
        confirmations: u32,
    ) -> ProviderFuture<'a, TransactionReceipt> {
        Box::pin(async move {
            let wanted = u64::from(confirmations.max(1));
            loop {
                if let Some(receipt) = self.receipt(hash).await? {
                    if let Some(block) = receipt.block_number.as_deref() {
                        let block_number = parse_quantity(block)?;
                        let head = self.block_number().await?;
                        let depth = head.saturating_sub(block_number) + 1;
                        if depth >= wanted {
                            return Ok(TransactionReceipt {
                                transaction_hash: receipt.transaction_hash,
                                block_number,
                                confirmations: u32::try_from(depth).unwrap_or(u32::MAX),
                                success: receipt.status.as_deref() != Some("0x0"),
                            });
                        }
                    }
                }
                log::trace!("Waiting for {} ({} confirmations)", hash, wanted);
                sleep(RECEIPT_POLL_INTERVAL_MS).await?;
            }
        })
    }

    fn subscribe(&self, handler: EventHandler) -> Result<()> {
        self.unsubscribe();

        let on = method(&self.inner, "on").ok_or_else(|| {
            Error::ProviderUnavailable("Provider does not support events".to_string())
        })?;

        let mut subscriptions = self.subscriptions.borrow_mut();
        for event in EIP1193_EVENTS {
            let handler = handler.clone();
            let closure = EventClosure::new(move |payload: JsValue| {
                let payload: serde_json::Value =
                    serde_wasm_bindgen::from_value(payload).unwrap_or(serde_json::Value::Null);
                match WalletEvent::from_eip1193(event, &payload) {
                    Some(wallet_event) => handler(wallet_event),
                    None => log::warn!("Ignoring malformed {} payload: {}", event, payload),
                }
            });
            on.call2(
                &self.inner,
                &JsValue::from_str(event),
                closure.as_ref().unchecked_ref(),
            )
            .map_err(|e| js_call_error(&format!("Failed to subscribe to {}", event), &e))?;
            subscriptions.push((event, closure));
        }
        Ok(())
    }

    fn unsubscribe(&self) {
        let subscriptions: Vec<_> = self.subscriptions.borrow_mut().drain(..).collect();
        if subscriptions.is_empty() {
            return;
        }
        let Some(remove) = method(&self.inner, "removeListener") else {
            log::debug!("Provider has no removeListener; dropping handlers");
            return;
        };
        for (event, closure) in subscriptions {
            if let Err(e) = remove.call2(
                &self.inner,
                &JsValue::from_str(event),
                closure.as_ref().unchecked_ref(),
            ) {
                log::warn!("Failed to remove {} listener: {:?}", event, e);
            }
        }
    }
}

impl Drop for JsEip1193Provider {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwitchChain {
    chain_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

/// Look up a function-valued property.
pub(crate) fn method(target: &JsValue, name: &str) -> Option<Function> {
    if !target.is_object() {
        return None;
    }
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
}

/// Serialize a positional params array.
fn params<T: Serialize>(items: &[T]) -> Result<JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    let array = Array::new();
    for item in items {
        let value = item
            .serialize(&serializer)
            .map_err(|e| Error::Other(format!("Serialization error: {}", e)))?;
        array.push(&value);
    }
    Ok(array.into())
}

fn parse_quantity(hex: &str) -> Result<u64> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::Parse(format!("Invalid quantity {}: {}", hex, e)))
}

async fn sleep(ms: i32) -> Result<()> {
    let window =
        web_sys::window().ok_or_else(|| Error::Other("No window available".to_string()))?;
    let promise = Promise::new(&mut |resolve, reject| {
        if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
        {
            let _ = reject.call1(&JsValue::NULL, &e);
        }
    });
    JsFuture::from(promise)
        .await
        .map_err(|e| js_call_error("Timer failed", &e))?;
    Ok(())
}
