//! Wallet provider abstraction.
//!
//! The session never talks to a wallet SDK directly. Each connector kind is
//! backed by a [`ConnectorFactory`] that bootstraps a [`WalletProvider`]
//! adapter, and the adapter is responsible for normalizing its SDK's events
//! into [`WalletEvent`]s.

use crate::error::Result;
use crate::events::WalletEvent;
use crate::network::AddChainParams;
use crate::types::{ConnectorKind, TransactionReceipt, TransactionRequest};
use std::collections::HashMap;
use std::sync::Arc;

/// Type alias for provider futures.
///
/// On WASM targets, futures don't need to be `Send` since JavaScript is single-threaded.
/// On native targets, futures should be `Send` to allow use with multi-threaded runtimes.
#[cfg(target_arch = "wasm32")]
pub type ProviderFuture<'a, T> = futures::future::LocalBoxFuture<'a, Result<T>>;

#[cfg(not(target_arch = "wasm32"))]
pub type ProviderFuture<'a, T> = futures::future::BoxFuture<'a, Result<T>>;

/// Callback a provider invokes for every normalized event.
#[cfg(target_arch = "wasm32")]
pub type EventHandler = Arc<dyn Fn(WalletEvent)>;

#[cfg(not(target_arch = "wasm32"))]
pub type EventHandler = Arc<dyn Fn(WalletEvent) + Send + Sync>;

/// Shared handle to the active provider.
pub type SharedProvider = Arc<dyn WalletProvider>;

/// Adapter over a single wallet SDK connection.
///
/// Errors should already be mapped onto the crate taxonomy, typically with
/// [`crate::Error::from_rpc`].
#[cfg(target_arch = "wasm32")]
pub trait WalletProvider {
    /// Ask the wallet for account access (`eth_requestAccounts`).
    fn request_accounts(&self) -> ProviderFuture<'_, Vec<String>>;

    /// Currently active chain (`eth_chainId`).
    fn chain_id(&self) -> ProviderFuture<'_, u64>;

    /// Ask the wallet to switch its active chain (`wallet_switchEthereumChain`).
    ///
    /// Must fail with [`crate::Error::ChainUnknownToProvider`] when the wallet
    /// has never seen the chain.
    fn switch_chain(&self, chain_id: u64) -> ProviderFuture<'_, ()>;

    /// Register a chain with the wallet (`wallet_addEthereumChain`).
    fn add_chain<'a>(&'a self, params: &'a AddChainParams) -> ProviderFuture<'a, ()>;

    /// Submit a transaction, returning its hash.
    fn send_transaction<'a>(&'a self, tx: &'a TransactionRequest) -> ProviderFuture<'a, String>;

    /// Resolve once `hash` has `confirmations` confirmations.
    fn wait_for_transaction<'a>(
        &'a self,
        hash: &'a str,
        confirmations: u32,
    ) -> ProviderFuture<'a, TransactionReceipt>;

    /// Route account, chain and disconnect notifications to `handler`.
    ///
    /// Replaces any handler registered before.
    fn subscribe(&self, handler: EventHandler) -> Result<()>;

    /// Drop every subscription made through [`WalletProvider::subscribe`].
    fn unsubscribe(&self);
}

#[cfg(not(target_arch = "wasm32"))]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for account access (`eth_requestAccounts`).
    fn request_accounts(&self) -> ProviderFuture<'_, Vec<String>>;

    /// Currently active chain (`eth_chainId`).
    fn chain_id(&self) -> ProviderFuture<'_, u64>;

    /// Ask the wallet to switch its active chain (`wallet_switchEthereumChain`).
    ///
    /// Must fail with [`crate::Error::ChainUnknownToProvider`] when the wallet
    /// has never seen the chain.
    fn switch_chain(&self, chain_id: u64) -> ProviderFuture<'_, ()>;

    /// Register a chain with the wallet (`wallet_addEthereumChain`).
    fn add_chain<'a>(&'a self, params: &'a AddChainParams) -> ProviderFuture<'a, ()>;

    /// Submit a transaction, returning its hash.
    fn send_transaction<'a>(&'a self, tx: &'a TransactionRequest) -> ProviderFuture<'a, String>;

    /// Resolve once `hash` has `confirmations` confirmations.
    fn wait_for_transaction<'a>(
        &'a self,
        hash: &'a str,
        confirmations: u32,
    ) -> ProviderFuture<'a, TransactionReceipt>;

    /// Route account, chain and disconnect notifications to `handler`.
    ///
    /// Replaces any handler registered before.
    fn subscribe(&self, handler: EventHandler) -> Result<()>;

    /// Drop every subscription made through [`WalletProvider::subscribe`].
    fn unsubscribe(&self);
}

/// Parameters handed to a connector when a session opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorParams {
    pub kind: ConnectorKind,
    /// Every chain id in the network table.
    pub chains: Vec<u64>,
    /// WalletConnect cloud project id.
    pub project_id: Option<String>,
    /// Application name shown in wallet prompts.
    pub app_name: String,
    pub default_chain_id: u64,
    /// RPC endpoint of the default chain.
    pub rpc_url: String,
}

/// Bootstraps a provider for one connector kind.
#[cfg(target_arch = "wasm32")]
pub trait ConnectorFactory {
    fn open<'a>(&'a self, params: &'a ConnectorParams) -> ProviderFuture<'a, SharedProvider>;
}

#[cfg(not(target_arch = "wasm32"))]
pub trait ConnectorFactory: Send + Sync {
    fn open<'a>(&'a self, params: &'a ConnectorParams) -> ProviderFuture<'a, SharedProvider>;
}

/// Connector factories available to a session, keyed by kind.
#[derive(Default)]
pub struct ConnectorRegistry {
    factories: HashMap<ConnectorKind, Box<dyn ConnectorFactory>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register(&mut self, kind: ConnectorKind, factory: impl ConnectorFactory + 'static) {
        self.factories.insert(kind, Box::new(factory));
    }

    /// Builder-style [`ConnectorRegistry::register`].
    pub fn with(mut self, kind: ConnectorKind, factory: impl ConnectorFactory + 'static) -> Self {
        self.register(kind, factory);
        self
    }

    pub fn get(&self, kind: ConnectorKind) -> Option<&dyn ConnectorFactory> {
        self.factories.get(&kind).map(|f| f.as_ref())
    }

    pub fn kinds(&self) -> Vec<ConnectorKind> {
        ConnectorKind::ALL
            .into_iter()
            .filter(|k| self.factories.contains_key(k))
            .collect()
    }
}
