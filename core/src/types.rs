//! Shared types for the DApp Wallet SDK.

use crate::network::NetworkDescriptor;
use serde::{Deserialize, Serialize};

/// Serde module for EIP-1193 hex quantities (`"0x2386f26fc10000"`).
mod hex_quantity {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: std::fmt::LowerHex,
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(&format!("0x{:x}", v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: TryFrom<u128>,
        D: Deserializer<'de>,
    {
        let Some(s) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| serde::de::Error::custom("expected 0x-prefixed quantity"))?;
        let value = u128::from_str_radix(digits, 16).map_err(serde::de::Error::custom)?;
        T::try_from(value)
            .map(Some)
            .map_err(|_| serde::de::Error::custom("quantity out of range"))
    }
}

/// Wallet backend a session can connect through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// Browser-injected provider (MetaMask and compatible extensions).
    Injected,
    /// WalletConnect v2 relay.
    WalletConnect,
    /// Coinbase Wallet SDK.
    Coinbase,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 3] = [
        ConnectorKind::Injected,
        ConnectorKind::WalletConnect,
        ConnectorKind::Coinbase,
    ];
}

impl std::str::FromStr for ConnectorKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "injected" | "metamask" => Ok(ConnectorKind::Injected),
            "walletconnect" | "wallet_connect" => Ok(ConnectorKind::WalletConnect),
            "coinbase" => Ok(ConnectorKind::Coinbase),
            _ => Err(crate::error::Error::Parse(format!(
                "Unknown connector: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorKind::Injected => write!(f, "injected"),
            ConnectorKind::WalletConnect => write!(f, "walletconnect"),
            ConnectorKind::Coinbase => write!(f, "coinbase"),
        }
    }
}

/// Session lifecycle.
///
///   disconnected → connecting → connected
///   connecting → disconnected (handshake failed)
///   connected → disconnected (disconnect, remote disconnect, accounts emptied)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Public snapshot of the session handed to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub status: ConnectionStatus,
    /// True iff both `address` and `chain_id` are set.
    pub is_connected: bool,
    pub address: Option<String>,
    pub chain_id: Option<u64>,
    /// Descriptor for `chain_id`, when the chain is in the table.
    pub network: Option<NetworkDescriptor>,
    pub connector: Option<ConnectorKind>,
}

/// Result of a successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub address: String,
    pub chain_id: u64,
}

/// Outcome of a network switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NetworkSwitch {
    /// The provider switched directly.
    Switched { chain_id: u64 },
    /// The provider did not know the chain, so it was added first.
    ///
    /// `active` is true when the provider reported the target chain as active
    /// right after the add and the session already moved to it.
    Added { chain_id: u64, active: bool },
}

impl NetworkSwitch {
    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkSwitch::Switched { chain_id } | NetworkSwitch::Added { chain_id, .. } => {
                *chain_id
            }
        }
    }
}

/// Transaction to submit through `eth_sendTransaction`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Value in wei.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_quantity")]
    pub value: Option<u128>,
    /// Calldata, `0x`-prefixed hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_quantity")]
    pub gas: Option<u64>,
}

impl TransactionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Value in wei.
    pub fn value(mut self, wei: u128) -> Self {
        self.value = Some(wei);
        self
    }

    pub fn data(mut self, calldata: &[u8]) -> Self {
        self.data = Some(format!("0x{}", hex::encode(calldata)));
        self
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }
}

/// A transaction accepted by the provider but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub hash: String,
    pub from: String,
    pub chain_id: u64,
    pub request: TransactionRequest,
}

/// Receipt returned once the requested confirmation depth is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub confirmations: u32,
    /// False when the transaction was mined but reverted.
    pub success: bool,
}

/// Shorten an address for display: `0x1234...abcd`.
pub fn format_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
