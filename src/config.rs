//! Server-side configuration for an AgentKit-protected endpoint.
//!
//! Deserializable from JSON/TOML/env the way `x402_rs::config::Config`
//! itself is: fields fall back through `#[serde(default =
//! "...")]` to hardcoded defaults, so a caller only needs to spell out what
//! it wants to override.

use agentkit_types::{AccessMode, AccessModeError, ChainId};
use alloy_primitives::Address;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

mod config_defaults {
    pub fn default_max_age_secs() -> u64 {
        300
    }
}

/// Per-chain AgentBook configuration: the contract address (falling back to
/// the built-in deployment table when absent) and the RPC endpoint to query.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AgentBookChainConfig {
    #[serde(default)]
    pub contract_address: Option<String>,
    pub rpc_url: String,
}

/// Top-level AgentKit configuration for one protected endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AgentKitConfig {
    /// The access policy this endpoint grants verified humans.
    pub mode: AccessMode,
    /// How old a challenge's `issuedAt` may be, in seconds.
    #[serde(default = "config_defaults::default_max_age_secs")]
    pub max_age_secs: u64,
    /// The chains this endpoint accepts challenges for.
    pub supported_chains: Vec<ChainId>,
    /// Per-chain AgentBook contract address and RPC endpoint.
    pub agentbook: HashMap<ChainId, AgentBookChainConfig>,
}

/// Errors raised while turning an [`AgentKitConfig`] into runtime components.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    AccessMode(#[from] AccessModeError),
    #[error("invalid AgentBook contract address {0:?} for chain {1}")]
    InvalidContractAddress(String, ChainId),
    #[error("invalid RPC URL {0:?} for chain {1}")]
    InvalidRpcUrl(String, ChainId),
}

impl AgentKitConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Validates the configured mode and parses the per-chain AgentBook
    /// settings into the maps [`crate::agentbook::AgentBook::new`] expects.
    pub fn parse_agentbook_settings(
        &self,
    ) -> Result<(HashMap<ChainId, Address>, HashMap<ChainId, Url>), ConfigError> {
        self.mode.validate()?;

        let mut contract_overrides = HashMap::new();
        let mut rpc_urls = HashMap::new();

        for (chain_id, chain_config) in &self.agentbook {
            if let Some(address) = &chain_config.contract_address {
                let parsed = Address::from_str(address)
                    .map_err(|_| ConfigError::InvalidContractAddress(address.clone(), chain_id.clone()))?;
                contract_overrides.insert(chain_id.clone(), parsed);
            }
            let url = Url::parse(&chain_config.rpc_url)
                .map_err(|_| ConfigError::InvalidRpcUrl(chain_config.rpc_url.clone(), chain_id.clone()))?;
            rpc_urls.insert(chain_id.clone(), url);
        }

        Ok((contract_overrides, rpc_urls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_camel_case_json() {
        // The `AgentKitConfig` struct itself uses snake_case field names,
        // matching how config files typically round-trip through serde's
        // default renaming here (no `rename_all` applied) -- this test
        // documents that this config's wire shape is snake_case, unlike the
        // challenge payload's camelCase wire shape.
        let json = serde_json::json!({
            "mode": { "type": "free-trial", "uses": 3 },
            "max_age_secs": 120,
            "supported_chains": ["eip155:8453"],
            "agentbook": {
                "eip155:8453": {
                    "contract_address": "0x1111111111111111111111111111111111111111",
                    "rpc_url": "https://base-mainnet.example/rpc"
                }
            }
        });
        let config: AgentKitConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.max_age(), Duration::from_secs(120));
        assert_eq!(config.supported_chains, vec![ChainId::new("eip155", "8453")]);
    }

    #[test]
    fn parses_agentbook_settings() {
        let json = serde_json::json!({
            "mode": { "type": "free" },
            "supported_chains": ["eip155:8453"],
            "agentbook": {
                "eip155:8453": {
                    "contract_address": "0x1111111111111111111111111111111111111111",
                    "rpc_url": "https://base-mainnet.example/rpc"
                }
            }
        });
        let config: AgentKitConfig = serde_json::from_value(json).unwrap();
        let (contracts, rpcs) = config.parse_agentbook_settings().unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(rpcs.len(), 1);
    }

    #[test]
    fn rejects_invalid_mode() {
        let json = serde_json::json!({
            "mode": { "type": "discount", "percent": 0, "uses": null },
            "supported_chains": [],
            "agentbook": {}
        });
        let config: AgentKitConfig = serde_json::from_value(json).unwrap();
        let err = config.parse_agentbook_settings().unwrap_err();
        assert!(matches!(err, ConfigError::AccessMode(_)));
    }
}
