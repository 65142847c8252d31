//! Error types for the DApp Wallet SDK.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// EIP-1193 code: the user rejected the request.
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 code: the requested method or account is not authorized.
pub const UNAUTHORIZED_CODE: i64 = 4100;
/// EIP-1193 code: the provider is disconnected from all chains.
pub const DISCONNECTED_CODE: i64 = 4900;
/// EIP-1193 code: the provider is not connected to the requested chain.
pub const CHAIN_DISCONNECTED_CODE: i64 = 4901;
/// Code returned by `wallet_switchEthereumChain` for a chain the wallet has never seen.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Errors that can occur in the DApp Wallet SDK.
#[derive(Error, Debug)]
pub enum Error {
    /// Required wallet extension or SDK is not present.
    #[error("Wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Connector configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The user declined the account, network or transaction prompt.
    #[error("User rejected the request: {0}")]
    UserRejected(String),

    /// Provider returned an empty account list.
    #[error("No accounts found.")]
    NoAccounts,

    /// Chain id is not part of the network table.
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(u64),

    /// The provider does not know the chain and needs `wallet_addEthereumChain` first.
    #[error("Chain {0} is unknown to the wallet provider")]
    ChainUnknownToProvider(u64),

    /// Operation requires a connected wallet.
    #[error("Wallet not connected")]
    NotConnected,

    /// Another connection handshake is still running.
    #[error("A wallet connection is already in progress")]
    ConnectInProgress,

    /// The handshake was superseded by a disconnect before it finished.
    #[error("Wallet connection was cancelled")]
    Cancelled,

    /// Failure reported by the underlying provider, message kept verbatim.
    #[error("{message}")]
    Provider { code: Option<i64>, message: String },

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map an EIP-1193 provider error onto the taxonomy.
    ///
    /// `chain_id` is the chain a switch request targeted; the unrecognized-chain
    /// code only becomes [`Error::ChainUnknownToProvider`] when it is known.
    pub fn from_rpc(code: Option<i64>, message: impl Into<String>, chain_id: Option<u64>) -> Self {
        let message = message.into();
        match (code, chain_id) {
            (Some(USER_REJECTED_CODE), _) => Error::UserRejected(message),
            (Some(UNRECOGNIZED_CHAIN_CODE), Some(chain_id)) => {
                Error::ChainUnknownToProvider(chain_id)
            }
            (Some(UNAUTHORIZED_CODE | DISCONNECTED_CODE | CHAIN_DISCONNECTED_CODE), _) => {
                Error::NotConnected
            }
            _ => Error::Provider { code, message },
        }
    }

    /// Stable tag for UI notifications.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ProviderUnavailable(_) => "provider_unavailable",
            Error::Config(_) => "config",
            Error::UserRejected(_) => "user_rejected",
            Error::NoAccounts => "no_accounts",
            Error::UnsupportedNetwork(_) => "unsupported_network",
            Error::ChainUnknownToProvider(_) => "chain_unknown_to_provider",
            Error::NotConnected => "not_connected",
            Error::ConnectInProgress => "connect_in_progress",
            Error::Cancelled => "cancelled",
            Error::Provider { .. } => "provider_error",
            Error::Parse(_) => "parse",
            Error::Serde(_) => "serde",
            Error::Other(_) => "other",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(format!("{:#}", err))
    }
}
