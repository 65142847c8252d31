//! Connector factories backed by JavaScript.
//!
//! The injected connector reads `window.ethereum` directly. WalletConnect and
//! Coinbase Wallet ship as JS SDKs, so the application hands in a bootstrap
//! callback that builds their provider object.

use crate::eip1193::{JsEip1193Provider, method};
use crate::error::js_call_error;
use crate::js_types::JsConnectorParams;
use dapp_wallet_core::{
    ConnectorFactory, ConnectorKind, ConnectorParams, Error, ProviderFuture, SharedProvider,
};
use js_sys::{Function, Promise, Reflect};
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// Opens the browser-injected provider (MetaMask and compatible extensions).
#[derive(Debug, Default, Clone, Copy)]
pub struct InjectedConnector;

impl ConnectorFactory for InjectedConnector {
    fn open<'a>(&'a self, _params: &'a ConnectorParams) -> ProviderFuture<'a, SharedProvider> {
        Box::pin(async move {
            let ethereum = injected_ethereum().ok_or_else(|| {
                Error::ProviderUnavailable("MetaMask is not installed.".to_string())
            })?;
            log::debug!("Using injected provider");
            Ok(Arc::new(JsEip1193Provider::new(ethereum)?) as SharedProvider)
        })
    }
}

/// `window.ethereum`, when an extension injected one.
fn injected_ethereum() -> Option<JsValue> {
    let window = web_sys::window()?;
    Reflect::get(&window, &JsValue::from_str("ethereum"))
        .ok()
        .filter(|v| v.is_object())
}

/// Connector whose provider comes from a JS bootstrap function.
///
/// The function receives the connector params as a plain object
/// (`{ kind, chains, projectId, appName, defaultChainId, rpcUrl }`) and
/// returns an EIP-1193 provider, or a Promise of one. If the provider has an
/// `enable` method it is awaited before the session requests accounts.
pub struct JsConnector {
    kind: ConnectorKind,
    bootstrap: Function,
}

impl JsConnector {
    pub fn new(kind: ConnectorKind, bootstrap: Function) -> Self {
        Self { kind, bootstrap }
    }
}

impl ConnectorFactory for JsConnector {
    fn open<'a>(&'a self, params: &'a ConnectorParams) -> ProviderFuture<'a, SharedProvider> {
        Box::pin(async move {
            let args = crate::to_js_value(&JsConnectorParams::from(params))
                .map_err(|e| js_call_error("Failed to serialize connector params", &e))?;

            let result = self.bootstrap.call1(&JsValue::NULL, &args).map_err(|e| {
                Error::ProviderUnavailable(format!(
                    "Failed to load {} SDK: {}",
                    self.kind,
                    describe(&e)
                ))
            })?;
            let provider = resolve(result).await.map_err(|e| {
                Error::ProviderUnavailable(format!(
                    "Failed to load {} SDK: {}",
                    self.kind,
                    describe(&e)
                ))
            })?;

            if let Some(enable) = method(&provider, "enable") {
                log::debug!("Enabling {} provider", self.kind);
                let enabled = enable
                    .call0(&provider)
                    .map_err(|e| crate::error::from_rpc_error(&e, None))?;
                resolve(enabled)
                    .await
                    .map_err(|e| crate::error::from_rpc_error(&e, None))?;
            }

            Ok(Arc::new(JsEip1193Provider::new(provider)?) as SharedProvider)
        })
    }
}

/// Await `value` if it is a Promise, otherwise return it as-is.
async fn resolve(value: JsValue) -> std::result::Result<JsValue, JsValue> {
    match value.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

fn describe(value: &JsValue) -> String {
    Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
