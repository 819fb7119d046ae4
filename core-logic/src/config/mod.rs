use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Read a required environment variable. Empty values count as missing.
pub fn env_required(var: &str) -> Result<String, ConfigError> {
    env_opt(var).ok_or_else(|| ConfigError::MissingEnv {
        var: var.to_string(),
    })
}

/// Read an optional environment variable, treating empty strings as unset.
pub fn env_opt(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Connection details for one contract on one EVM chain.
///
/// Populated from `RPC_URL_<CHAIN>`, `CONTRACT_ADDRESS_<CHAIN>`,
/// `PRIVATE_KEY_<CHAIN>` and the optional `CHAIN_ID_<CHAIN>`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_url: String,
    pub chain_id: Option<u64>,
    pub contract_address: String,
    #[serde(default)]
    pub private_key: Option<String>,
    /// Send pre-EIP-1559 transactions (`LEGACY_TX_<CHAIN>=true`).
    #[serde(default)]
    pub legacy: bool,
}

impl ChainConfig {
    pub fn from_env(chain: &str) -> Result<Self, ConfigError> {
        let suffix = chain.to_uppercase();
        let rpc_url = env_required(&format!("RPC_URL_{}", suffix))?;
        if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            return Err(ConfigError::InvalidRpcUrl { url: rpc_url });
        }

        let chain_id = match env_opt(&format!("CHAIN_ID_{}", suffix)) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                field: format!("CHAIN_ID_{}", suffix),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            name: chain.to_lowercase(),
            rpc_url,
            chain_id,
            contract_address: env_required(&format!("CONTRACT_ADDRESS_{}", suffix))?,
            private_key: env_opt(&format!("PRIVATE_KEY_{}", suffix)),
            legacy: env_opt(&format!("LEGACY_TX_{}", suffix))
                .is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")),
        })
    }

    /// Same as [`ChainConfig::from_env`] but fails when no signer key is set.
    pub fn from_env_with_signer(chain: &str) -> Result<Self, ConfigError> {
        let config = Self::from_env(chain)?;
        if config.private_key.is_none() {
            return Err(ConfigError::MissingEnv {
                var: format!("PRIVATE_KEY_{}", chain.to_uppercase()),
            });
        }
        Ok(config)
    }
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("name", &self.name)
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("contract_address", &self.contract_address)
            .field("legacy", &self.legacy)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}
