//! DApp Wallet SDK - Core Library
//!
//! Platform-agnostic wallet session management for EVM wallet providers.
//!
//! This crate provides the session logic that can be used in both native Rust
//! applications and WebAssembly environments. Wallet SDKs are abstracted
//! through traits that can be implemented for any backend (injected browser
//! wallets, WalletConnect, Coinbase Wallet, test doubles, etc.).
//!
//! # Example
//!
//! ```rust,ignore
//! use dapp_wallet_core::{ConnectorKind, ConnectorRegistry, WalletConfig, WalletSession};
//!
//! let registry = ConnectorRegistry::new().with(ConnectorKind::Injected, my_connector);
//! let session = WalletSession::new(WalletConfig::from_env(), registry);
//!
//! let _handle = session.add_listener(Arc::new(|state| println!("{:?}", state)));
//! let connection = session.connect(ConnectorKind::Injected).await?;
//! session.switch_network(137).await?;
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod listeners;
pub mod network;
pub mod provider;
pub mod session;
pub mod types;
pub mod units;

pub use config::WalletConfig;
pub use error::{Error, Result};
pub use events::WalletEvent;
pub use listeners::{Listener, ListenerHandle, ListenerId};
pub use network::{AddChainParams, NetworkDescriptor, Networks};
pub use provider::{
    ConnectorFactory, ConnectorParams, ConnectorRegistry, EventHandler, ProviderFuture,
    SharedProvider, WalletProvider,
};
pub use session::WalletSession;
pub use types::{
    Connection, ConnectionStatus, ConnectorKind, NetworkSwitch, PendingTransaction,
    TransactionReceipt, TransactionRequest, WalletState, format_address,
};
