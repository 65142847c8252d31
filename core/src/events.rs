//! Normalization of provider notifications.
//!
//! Every connector reports account, chain and disconnect changes in its own
//! shape. Adapters translate them into [`WalletEvent`] before the session sees
//! them, so the session only ever handles three canonical events.

use crate::network::parse_chain_id;
use serde_json::Value;

/// Canonical provider notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The active account changed to this address.
    AccountsChanged(String),
    /// The active chain changed.
    ChainChanged(u64),
    /// The provider dropped the connection, or no account is exposed anymore.
    Disconnected,
}

impl WalletEvent {
    /// Normalize an account list. An empty list means the user disconnected.
    pub fn from_accounts(accounts: Vec<String>) -> Self {
        match accounts.into_iter().find(|a| !a.is_empty()) {
            Some(address) => WalletEvent::AccountsChanged(address),
            None => WalletEvent::Disconnected,
        }
    }

    /// Normalize an EIP-1193 `on(event, payload)` notification.
    ///
    /// Returns `None` for events the session does not track and for payloads
    /// that cannot be interpreted.
    pub fn from_eip1193(event: &str, payload: &Value) -> Option<Self> {
        match event {
            "accountsChanged" => {
                let accounts = match payload {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                    Value::Null => Vec::new(),
                    other => {
                        log::warn!("Ignoring malformed accountsChanged payload: {}", other);
                        return None;
                    }
                };
                Some(WalletEvent::from_accounts(accounts))
            }
            "chainChanged" => match parse_chain_id(payload) {
                Ok(chain_id) => Some(WalletEvent::ChainChanged(chain_id)),
                Err(e) => {
                    log::warn!("Ignoring chainChanged event: {}", e);
                    None
                }
            },
            "disconnect" => Some(WalletEvent::Disconnected),
            _ => None,
        }
    }
}

/// Event names an EIP-1193 adapter subscribes to.
pub const EIP1193_EVENTS: [&str; 3] = ["accountsChanged", "chainChanged", "disconnect"];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_accounts_normalize_to_disconnect() {
        assert_eq!(WalletEvent::from_accounts(vec![]), WalletEvent::Disconnected);
        assert_eq!(
            WalletEvent::from_eip1193("accountsChanged", &json!([])),
            Some(WalletEvent::Disconnected)
        );
        assert_eq!(
            WalletEvent::from_eip1193("accountsChanged", &Value::Null),
            Some(WalletEvent::Disconnected)
        );
    }

    #[test]
    fn test_first_account_wins() {
        assert_eq!(
            WalletEvent::from_eip1193("accountsChanged", &json!(["0xaaa", "0xbbb"])),
            Some(WalletEvent::AccountsChanged("0xaaa".to_string()))
        );
    }

    #[test]
    fn test_chain_changed_shapes() {
        assert_eq!(
            WalletEvent::from_eip1193("chainChanged", &json!("0x89")),
            Some(WalletEvent::ChainChanged(137))
        );
        assert_eq!(
            WalletEvent::from_eip1193("chainChanged", &json!(5)),
            Some(WalletEvent::ChainChanged(5))
        );
        assert_eq!(WalletEvent::from_eip1193("chainChanged", &json!({})), None);
    }

    #[test]
    fn test_disconnect_and_unknown_events() {
        assert_eq!(
            WalletEvent::from_eip1193("disconnect", &json!({ "code": 4900 })),
            Some(WalletEvent::Disconnected)
        );
        assert_eq!(WalletEvent::from_eip1193("message", &json!({})), None);
    }
}
