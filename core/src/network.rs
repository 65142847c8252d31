//! Network descriptor table.
//!
//! Static reference data keyed by chain id, used for display and for building
//! `wallet_addEthereumChain` requests.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decimals of every native currency in the table.
const NATIVE_DECIMALS: u8 = 18;

/// A network the wallet session knows how to switch to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDescriptor {
    /// Display name, e.g. "Polygon Mainnet".
    pub name: String,
    /// Short label for compact UI, e.g. "Polygon".
    pub short_name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub explorer_url: String,
    /// Native currency symbol, e.g. "ETH".
    pub currency_symbol: String,
}

impl NetworkDescriptor {
    pub fn new(
        chain_id: u64,
        name: impl Into<String>,
        short_name: impl Into<String>,
        rpc_url: impl Into<String>,
        explorer_url: impl Into<String>,
        currency_symbol: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            chain_id,
            rpc_url: rpc_url.into(),
            explorer_url: explorer_url.into(),
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Build the EIP-3085 payload for this network.
    pub fn add_chain_params(&self) -> AddChainParams {
        AddChainParams {
            chain_id: to_hex_chain_id(self.chain_id),
            chain_name: self.name.clone(),
            native_currency: NativeCurrency {
                name: self.currency_symbol.clone(),
                symbol: self.currency_symbol.clone(),
                decimals: NATIVE_DECIMALS,
            },
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.explorer_url.clone()],
        }
    }
}

/// `wallet_addEthereumChain` request parameters (EIP-3085).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    /// Hex chain id with `0x` prefix.
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// The table of supported networks, keyed by chain id.
///
/// Serialized as a plain list of descriptors so it can live in JSON config
/// and cross the JS boundary without integer map keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NetworkDescriptor>", into = "Vec<NetworkDescriptor>")]
pub struct Networks {
    by_chain_id: BTreeMap<u64, NetworkDescriptor>,
}

impl Networks {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            by_chain_id: BTreeMap::new(),
        }
    }

    /// Add or replace a network.
    pub fn insert(&mut self, descriptor: NetworkDescriptor) -> Option<NetworkDescriptor> {
        self.by_chain_id.insert(descriptor.chain_id, descriptor)
    }

    pub fn get(&self, chain_id: u64) -> Option<&NetworkDescriptor> {
        self.by_chain_id.get(&chain_id)
    }

    /// Look up a network or fail with [`Error::UnsupportedNetwork`].
    pub fn require(&self, chain_id: u64) -> Result<&NetworkDescriptor> {
        self.get(chain_id)
            .ok_or(Error::UnsupportedNetwork(chain_id))
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.by_chain_id.contains_key(&chain_id)
    }

    /// Display name, or "Unknown Network".
    pub fn name(&self, chain_id: u64) -> &str {
        self.get(chain_id)
            .map(|n| n.name.as_str())
            .unwrap_or("Unknown Network")
    }

    /// Short display label, falling back to "Chain {id}".
    pub fn friendly_name(&self, chain_id: u64) -> String {
        match self.get(chain_id) {
            Some(network) => network.short_name.clone(),
            None => format!("Chain {}", chain_id),
        }
    }

    /// All chain ids in ascending order.
    pub fn chain_ids(&self) -> Vec<u64> {
        self.by_chain_id.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkDescriptor> {
        self.by_chain_id.values()
    }

    /// EIP-3085 payload for a supported chain.
    pub fn add_chain_params(&self, chain_id: u64) -> Result<AddChainParams> {
        Ok(self.require(chain_id)?.add_chain_params())
    }
}

impl Default for Networks {
    fn default() -> Self {
        [
            NetworkDescriptor::new(
                1,
                "Ethereum Mainnet",
                "Ethereum",
                "https://rpc.ankr.com/eth",
                "https://etherscan.io",
                "ETH",
            ),
            NetworkDescriptor::new(
                5,
                "Goerli Testnet",
                "Goerli",
                "https://rpc.ankr.com/eth_goerli",
                "https://goerli.etherscan.io",
                "ETH",
            ),
            NetworkDescriptor::new(
                137,
                "Polygon Mainnet",
                "Polygon",
                "https://polygon-rpc.com",
                "https://polygonscan.com",
                "MATIC",
            ),
            NetworkDescriptor::new(
                80001,
                "Mumbai Testnet",
                "Polygon Mumbai",
                "https://rpc.ankr.com/polygon_mumbai",
                "https://mumbai.polygonscan.com",
                "MATIC",
            ),
        ]
        .into_iter()
        .collect()
    }
}

impl FromIterator<NetworkDescriptor> for Networks {
    fn from_iter<I: IntoIterator<Item = NetworkDescriptor>>(iter: I) -> Self {
        let mut networks = Networks::empty();
        for descriptor in iter {
            networks.insert(descriptor);
        }
        networks
    }
}

impl From<Vec<NetworkDescriptor>> for Networks {
    fn from(list: Vec<NetworkDescriptor>) -> Self {
        list.into_iter().collect()
    }
}

impl From<Networks> for Vec<NetworkDescriptor> {
    fn from(networks: Networks) -> Self {
        networks.by_chain_id.into_values().collect()
    }
}

/// Format a chain id the way EIP-1193 requests expect it.
pub fn to_hex_chain_id(chain_id: u64) -> String {
    format!("0x{:x}", chain_id)
}

/// Parse a chain id from a provider payload.
///
/// Wallets disagree on the shape: hex strings, decimal strings and plain
/// numbers are all seen in `chainChanged` events and `eth_chainId` replies.
pub fn parse_chain_id(value: &serde_json::Value) -> Result<u64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| Error::Parse(format!("Invalid chain id: {}", n))),
        serde_json::Value::String(s) => parse_chain_id_str(s),
        other => Err(Error::Parse(format!("Invalid chain id: {}", other))),
    }
}

fn parse_chain_id_str(s: &str) -> Result<u64> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| Error::Parse(format!("Invalid chain id {:?}: {}", s, e)))
}
