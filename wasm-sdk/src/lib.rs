//! DApp Wallet SDK - WASM Bindings
//!
//! This crate provides WebAssembly bindings for the DApp Wallet SDK.
//! It wraps the core session manager with WASM-compatible types and bridges
//! JavaScript EIP-1193 providers to the core provider traits.
//!
//! **Note:** This crate is WASM-only and will not compile for native targets.
//!
//! # Usage from JavaScript/TypeScript
//!
//! ```javascript
//! import init, { WalletClient } from '@dapp/wallet-sdk';
//! import { EthereumProvider } from '@walletconnect/ethereum-provider';
//!
//! // Initialize WASM
//! await init();
//!
//! // WalletConnect is optional; MetaMask (window.ethereum) is always available
//! const wallet = new WalletClient(
//!     { walletconnectProjectId: 'abc123' },
//!     (params) => EthereumProvider.init({
//!         projectId: params.projectId,
//!         chains: [params.defaultChainId],
//!         optionalChains: params.chains,
//!         showQrModal: true,
//!     }),
//! );
//!
//! const detach = wallet.addListener((state) => console.log(state.status, state.address));
//!
//! const { address, chainId } = await wallet.connect('injected');
//! await wallet.switchNetwork(137);
//! const tx = await wallet.sendEther('0x...', '0.01');
//! await wallet.waitForTransaction(tx.hash);
//!
//! wallet.disconnect();
//! detach();
//! ```

// This crate only compiles for WASM targets
#![cfg(target_arch = "wasm32")]

mod client;
mod connectors;
mod eip1193;
mod error;
mod js_types;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use client::*;
pub use connectors::*;
pub use eip1193::JsEip1193Provider;
pub use error::*;
pub use js_types::*;

/// Initialize the WASM module.
///
/// This sets up logging and panic hooks for better debugging.
#[wasm_bindgen(start)]
pub fn initialize() {
    // Set up panic hook for better error messages
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("DApp Wallet SDK initialized");
}

/// Serialize a value to JsValue as a plain object (not a Map).
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value
        .serialize(&serializer)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Shorten an address for display: `0x1234...abcd`.
#[wasm_bindgen(js_name = "formatAddress")]
pub fn format_address(address: &str) -> String {
    dapp_wallet_core::format_address(address)
}

/// Whether `chain_id` is in the default network table.
#[wasm_bindgen(js_name = "isSupportedNetwork")]
pub fn is_supported_network(chain_id: f64) -> bool {
    chain_id >= 0.0
        && chain_id.fract() == 0.0
        && dapp_wallet_core::Networks::default().is_supported(chain_id as u64)
}
