use crate::connectors::{InjectedConnector, JsConnector};
use crate::error::to_js_error;
use crate::js_types::{ConnectResult, Connector, NetworkInfo};
use crate::{map_err_to_js, to_js_value};
use dapp_wallet_core::units::parse_ether;
use dapp_wallet_core::{
    ConnectorKind, ConnectorRegistry, Listener, TransactionRequest, WalletConfig, WalletSession,
    WalletState,
};
use js_sys::Function;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// JS callbacks and the listener wrapping each, so one function maps to one registration.
type JsListeners = Rc<RefCell<Vec<(Function, Listener)>>>;
use wasm_bindgen::prelude::*;

/// Wallet session handle for JavaScript.
///
/// Construct one per application and share it; every method works on the
/// same session.
#[wasm_bindgen]
pub struct WalletClient {
    inner: WalletSession,
    listeners: JsListeners,
}

#[wasm_bindgen]
impl WalletClient {
    /// Create a disconnected session.
    ///
    /// # Arguments
    /// * `config` - Wallet config object, or `undefined` for defaults
    ///   (`{ networks?, walletconnectProjectId?, appName?, defaultChainId?, defaultConfirmations? }`)
    /// * `walletconnect` - Optional `(params) => Promise<EIP1193Provider>` building a WalletConnect provider
    /// * `coinbase` - Optional `(params) => Promise<EIP1193Provider>` building a Coinbase Wallet provider
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        walletconnect: Option<Function>,
        coinbase: Option<Function>,
    ) -> Result<WalletClient, JsValue> {
        let config: WalletConfig = if config.is_undefined() || config.is_null() {
            WalletConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid wallet config: {}", e)))?
        };
        map_err_to_js!(config.validate())?;

        let mut registry =
            ConnectorRegistry::new().with(ConnectorKind::Injected, InjectedConnector);
        if let Some(bootstrap) = walletconnect {
            registry.register(
                ConnectorKind::WalletConnect,
                JsConnector::new(ConnectorKind::WalletConnect, bootstrap),
            );
        }
        if let Some(bootstrap) = coinbase {
            registry.register(
                ConnectorKind::Coinbase,
                JsConnector::new(ConnectorKind::Coinbase, bootstrap),
            );
        }
        log::debug!("Wallet connectors: {:?}", registry.kinds());

        Ok(WalletClient {
            inner: WalletSession::new(config, registry),
            listeners: JsListeners::default(),
        })
    }

    /// Connect through `connector` (`"injected"`, `"walletconnect"` or `"coinbase"`).
    #[wasm_bindgen(js_name = "connect")]
    pub async fn connect(&self, connector: String) -> Result<ConnectResult, JsValue> {
        let kind: ConnectorKind = map_err_to_js!(connector.parse())?;
        let connection = map_err_to_js!(self.inner.connect(kind).await)?;
        Ok(connection.into())
    }

    #[wasm_bindgen(js_name = "disconnect")]
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Switch the wallet to `chain_id`, adding the network first if needed.
    ///
    /// Resolves to `{ outcome: "switched" | "added", chainId, active? }`.
    #[wasm_bindgen(js_name = "switchNetwork")]
    pub async fn switch_network(&self, chain_id: f64) -> Result<JsValue, JsValue> {
        let chain_id = chain_id_from_js(chain_id)?;
        let outcome = map_err_to_js!(self.inner.switch_network(chain_id).await)?;
        to_js_value(&outcome)
    }

    #[wasm_bindgen(js_name = "addNetwork")]
    pub async fn add_network(&self, chain_id: f64) -> Result<(), JsValue> {
        let chain_id = chain_id_from_js(chain_id)?;
        map_err_to_js!(self.inner.add_network(chain_id).await)
    }

    /// Submit `{ to, value, data, gas }` (hex quantities) from the connected account.
    #[wasm_bindgen(js_name = "sendTransaction")]
    pub async fn send_transaction(&self, tx: JsValue) -> Result<JsValue, JsValue> {
        let tx: TransactionRequest = serde_wasm_bindgen::from_value(tx)
            .map_err(|e| JsValue::from_str(&format!("Invalid transaction: {}", e)))?;
        let pending = map_err_to_js!(self.inner.send_transaction(tx).await)?;
        to_js_value(&pending)
    }

    /// Send `amount` ether (decimal string, e.g. `"0.01"`) to `to`.
    #[wasm_bindgen(js_name = "sendEther")]
    pub async fn send_ether(&self, to: String, amount: String) -> Result<JsValue, JsValue> {
        let amount: Decimal = amount
            .trim()
            .parse()
            .map_err(|_| JsValue::from_str("Could not parse amount"))?;
        let wei = map_err_to_js!(parse_ether(amount))?;

        let tx = TransactionRequest::new().to(to).value(wei);
        let pending = map_err_to_js!(self.inner.send_transaction(tx).await)?;
        to_js_value(&pending)
    }

    #[wasm_bindgen(js_name = "waitForTransaction")]
    pub async fn wait_for_transaction(
        &self,
        hash: String,
        confirmations: Option<u32>,
    ) -> Result<JsValue, JsValue> {
        let receipt = map_err_to_js!(self.inner.wait_for_transaction(&hash, confirmations).await)?;
        to_js_value(&receipt)
    }

    /// Snapshot of `{ status, isConnected, address, chainId, network, connector }`.
    #[wasm_bindgen(js_name = "getState")]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.inner.state())
    }

    /// Call `callback(state)` after every state change.
    ///
    /// Adding the same function again keeps a single registration. Returns a
    /// function that removes the listener.
    #[wasm_bindgen(js_name = "addListener")]
    pub fn add_listener(&self, callback: Function) -> JsValue {
        let listener = self.listener_for(&callback);

        let mut handle = Some(self.inner.add_listener(listener));
        let registered = Rc::downgrade(&self.listeners);
        Closure::<dyn FnMut()>::new(move || {
            let Some(handle) = handle.take() else {
                return;
            };
            if handle.detach() {
                if let Some(registered) = registered.upgrade() {
                    registered
                        .borrow_mut()
                        .retain(|(f, _)| !same_function(f, &callback));
                }
            }
        })
        .into_js_value()
    }

    #[wasm_bindgen(getter, js_name = "isConnected")]
    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    #[wasm_bindgen(getter)]
    pub fn address(&self) -> Option<String> {
        self.inner.address()
    }

    #[wasm_bindgen(getter, js_name = "chainId")]
    pub fn chain_id(&self) -> Option<f64> {
        self.inner.chain_id().map(|id| id as f64)
    }

    #[wasm_bindgen(getter)]
    pub fn connector(&self) -> Option<Connector> {
        self.inner.connector().map(Connector::from)
    }

    #[wasm_bindgen(getter)]
    pub fn network(&self) -> Option<NetworkInfo> {
        self.inner.network().as_ref().map(NetworkInfo::from)
    }

    #[wasm_bindgen(js_name = "getNetworks")]
    pub fn get_networks(&self) -> Vec<NetworkInfo> {
        self.inner.networks().iter().map(NetworkInfo::from).collect()
    }

    #[wasm_bindgen(js_name = "isNetworkSupported")]
    pub fn is_network_supported(&self, chain_id: f64) -> bool {
        chain_id_from_js(chain_id)
            .map(|id| self.inner.is_network_supported(id))
            .unwrap_or(false)
    }

    #[wasm_bindgen(js_name = "getNetworkName")]
    pub fn get_network_name(&self, chain_id: f64) -> String {
        match chain_id_from_js(chain_id) {
            Ok(id) => self.inner.network_name(id).to_string(),
            Err(_) => "Unknown Network".to_string(),
        }
    }
}

impl WalletClient {
    /// The listener already wrapping `callback`, or a new one.
    fn listener_for(&self, callback: &Function) -> Listener {
        let mut listeners = self.listeners.borrow_mut();
        if let Some((_, listener)) = listeners.iter().find(|(f, _)| same_function(f, callback)) {
            return listener.clone();
        }

        let js_callback = callback.clone();
        let listener: Listener = Arc::new(move |state: &WalletState| {
            let state = match to_js_value(state) {
                Ok(state) => state,
                Err(e) => {
                    log::error!("Failed to serialize wallet state: {:?}", e);
                    return;
                }
            };
            if let Err(e) = js_callback.call1(&JsValue::NULL, &state) {
                log::error!("Wallet listener threw: {:?}", e);
            }
        });
        listeners.push((callback.clone(), listener.clone()));
        listener
    }
}

/// Identity comparison (`===`) of two JS functions.
fn same_function(a: &Function, b: &Function) -> bool {
    let a: &JsValue = a.as_ref();
    let b: &JsValue = b.as_ref();
    a == b
}

fn chain_id_from_js(chain_id: f64) -> Result<u64, JsValue> {
    if chain_id.is_finite() && chain_id >= 0.0 && chain_id.fract() == 0.0 {
        Ok(chain_id as u64)
    } else {
        Err(to_js_error(dapp_wallet_core::Error::Parse(format!(
            "Invalid chain id: {}",
            chain_id
        ))))
    }
}
