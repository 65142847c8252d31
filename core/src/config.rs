//! Session configuration.

use crate::error::{Error, Result};
use crate::network::Networks;
use crate::provider::ConnectorParams;
use crate::types::ConnectorKind;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Environment variable holding the WalletConnect cloud project id.
pub const ENV_WC_PROJECT_ID: &str = "DAPP_WALLET_WC_PROJECT_ID";
/// Environment variable overriding the application name shown in wallet prompts.
pub const ENV_APP_NAME: &str = "DAPP_WALLET_APP_NAME";

const DEFAULT_APP_NAME: &str = "Ecommerce DApp";

/// Configuration of a [`crate::WalletSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletConfig {
    /// Networks the session may switch to.
    pub networks: Networks,
    /// Required by the WalletConnect connector.
    pub walletconnect_project_id: Option<String>,
    pub app_name: String,
    /// Chain the Coinbase connector starts on.
    pub default_chain_id: u64,
    /// Confirmation depth used when `wait_for_transaction` gets none.
    pub default_confirmations: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            networks: Networks::default(),
            walletconnect_project_id: None,
            app_name: DEFAULT_APP_NAME.to_string(),
            default_chain_id: 1,
            default_confirmations: 1,
        }
    }
}

impl WalletConfig {
    /// Defaults overridden by `DAPP_WALLET_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(id) = std::env::var(ENV_WC_PROJECT_ID)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            config.walletconnect_project_id = Some(id);
        }
        if let Some(name) = std::env::var(ENV_APP_NAME)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            config.app_name = name;
        }
        config
    }

    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: WalletConfig =
            serde_json::from_str(json).context("Failed to parse wallet config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if !self.networks.is_supported(self.default_chain_id) {
            return Err(Error::Config(format!(
                "Default chain {} is not in the network table",
                self.default_chain_id
            )));
        }
        if self.default_confirmations == 0 {
            return Err(Error::Config(
                "default_confirmations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the parameters a connector is opened with.
    pub fn connector_params(&self, kind: ConnectorKind) -> Result<ConnectorParams> {
        let project_id = self
            .walletconnect_project_id
            .clone()
            .filter(|id| !id.trim().is_empty());
        if kind == ConnectorKind::WalletConnect && project_id.is_none() {
            return Err(Error::Config(format!(
                "WalletConnect projectId missing (set {})",
                ENV_WC_PROJECT_ID
            )));
        }

        let default_network = self.networks.require(self.default_chain_id).map_err(|_| {
            Error::Config(format!(
                "Default chain {} is not in the network table",
                self.default_chain_id
            ))
        })?;

        Ok(ConnectorParams {
            kind,
            chains: self.networks.chain_ids(),
            project_id,
            app_name: self.app_name.clone(),
            default_chain_id: self.default_chain_id,
            rpc_url: default_network.rpc_url.clone(),
        })
    }
}
