//! WASM-friendly type wrappers.
//!
//! These types wrap the core SDK types with wasm_bindgen annotations
//! for seamless JavaScript interop.

use dapp_wallet_core as wallet;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Wallet connector kind.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    Injected,
    WalletConnect,
    Coinbase,
}

impl From<wallet::ConnectorKind> for Connector {
    fn from(kind: wallet::ConnectorKind) -> Self {
        match kind {
            wallet::ConnectorKind::Injected => Connector::Injected,
            wallet::ConnectorKind::WalletConnect => Connector::WalletConnect,
            wallet::ConnectorKind::Coinbase => Connector::Coinbase,
        }
    }
}

impl From<Connector> for wallet::ConnectorKind {
    fn from(connector: Connector) -> Self {
        match connector {
            Connector::Injected => wallet::ConnectorKind::Injected,
            Connector::WalletConnect => wallet::ConnectorKind::WalletConnect,
            Connector::Coinbase => wallet::ConnectorKind::Coinbase,
        }
    }
}

/// A network from the supported-network table.
#[wasm_bindgen(getter_with_clone)]
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    #[wasm_bindgen(js_name = "chainId")]
    pub chain_id: f64,
    pub name: String,
    #[wasm_bindgen(js_name = "shortName")]
    pub short_name: String,
    #[wasm_bindgen(js_name = "rpcUrl")]
    pub rpc_url: String,
    #[wasm_bindgen(js_name = "explorerUrl")]
    pub explorer_url: String,
    #[wasm_bindgen(js_name = "currencySymbol")]
    pub currency_symbol: String,
}

impl From<&wallet::NetworkDescriptor> for NetworkInfo {
    fn from(n: &wallet::NetworkDescriptor) -> Self {
        NetworkInfo {
            chain_id: n.chain_id as f64,
            name: n.name.clone(),
            short_name: n.short_name.clone(),
            rpc_url: n.rpc_url.clone(),
            explorer_url: n.explorer_url.clone(),
            currency_symbol: n.currency_symbol.clone(),
        }
    }
}

/// Result of a successful connect.
#[wasm_bindgen(getter_with_clone)]
#[derive(Debug, Clone)]
pub struct ConnectResult {
    pub address: String,
    #[wasm_bindgen(js_name = "chainId")]
    pub chain_id: f64,
}

impl From<wallet::Connection> for ConnectResult {
    fn from(c: wallet::Connection) -> Self {
        ConnectResult {
            address: c.address,
            chain_id: c.chain_id as f64,
        }
    }
}

/// Parameters handed to a JS connector bootstrap function.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsConnectorParams {
    pub kind: String,
    pub chains: Vec<u64>,
    pub project_id: Option<String>,
    pub app_name: String,
    pub default_chain_id: u64,
    pub rpc_url: String,
}

impl From<&wallet::ConnectorParams> for JsConnectorParams {
    fn from(p: &wallet::ConnectorParams) -> Self {
        JsConnectorParams {
            kind: p.kind.to_string(),
            chains: p.chains.clone(),
            project_id: p.project_id.clone(),
            app_name: p.app_name.clone(),
            default_chain_id: p.default_chain_id,
            rpc_url: p.rpc_url.clone(),
        }
    }
}
