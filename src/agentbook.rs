//! AgentBook client: resolves a wallet address to an anonymous human
//! identifier via an on-chain `lookupHuman(address) returns (uint256)` view
//! call.
//!
//! RPC clients are cached per `chainId` the way `x402-chain-eip155`'s
//! `PendingNonceManager` caches per-key state in a
//! `DashMap` — lazily, tolerating a last-writer-wins race on first use since
//! the providers themselves are stateless.

use agentkit_types::{ChainId, HumanId};
use alloy_primitives::Address;
use alloy_provider::{ProviderBuilder, RootProvider};
use dashmap::DashMap;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use url::Url;

alloy_sol_types::sol! {
    /// The on-chain registry mapping a wallet to an anonymous human identifier,
    /// populated out-of-band via a zero-knowledge proof of personhood.
    #[sol(rpc)]
    contract AgentBookContract {
        /// Returns the human identifier registered for `wallet`, or zero if unregistered.
        function lookupHuman(address wallet) external view returns (uint256);
    }
}

/// Errors raised while resolving a wallet to a human identifier.
///
/// Only [`AgentBookError::UnconfiguredChain`] and
/// [`AgentBookError::NoRpcConfigured`] propagate to the caller — both are
/// configuration errors in substance, even though they surface at lookup
/// time rather than at `AgentBook` construction, since the set of chains a
/// given request may name isn't known until the request arrives. Every other
/// failure (malformed wallet address, RPC error, contract revert) is
/// swallowed by [`AgentBook::lookup_human`] and mapped to `Ok(None)` —
/// a transient RPC failure must never grant spurious access.
#[derive(Debug, thiserror::Error)]
pub enum AgentBookError {
    #[error("no AgentBook contract address configured for chain {0}; provide an override or extend the built-in deployment table")]
    UnconfiguredChain(ChainId),
    #[error("no RPC URL configured for chain {0}")]
    NoRpcConfigured(ChainId),
}

/// Static table from `chainId` → AgentBook contract address.
///
/// Empty at inception: the contract has not been deployed anywhere yet.
/// Treat the absence of a mapping as a configuration requirement for
/// callers, not a bug — see `AgentBookError::UnconfiguredChain`.
const BUILTIN_DEPLOYMENTS: &[(&str, &str)] = &[];

fn builtin_deployment(chain_id: &ChainId) -> Option<Address> {
    let key = chain_id.to_string();
    BUILTIN_DEPLOYMENTS
        .iter()
        .find(|(id, _)| *id == key)
        .and_then(|(_, addr)| Address::from_str(addr).ok())
}

/// Resolves wallet addresses to AgentBook human identifiers over RPC, with
/// per-chain contract address and RPC URL configuration plus a per-chain
/// provider cache.
pub struct AgentBook {
    contract_overrides: HashMap<ChainId, Address>,
    rpc_urls: HashMap<ChainId, Url>,
    providers: DashMap<ChainId, Arc<RootProvider>>,
}

impl AgentBook {
    /// `contract_overrides` takes priority over [`BUILTIN_DEPLOYMENTS`];
    /// `rpc_urls` is the RPC endpoint used for each configured chain.
    pub fn new(contract_overrides: HashMap<ChainId, Address>, rpc_urls: HashMap<ChainId, Url>) -> Self {
        Self {
            contract_overrides,
            rpc_urls,
            providers: DashMap::new(),
        }
    }

    fn contract_address(&self, chain_id: &ChainId) -> Result<Address, AgentBookError> {
        self.contract_overrides
            .get(chain_id)
            .copied()
            .or_else(|| builtin_deployment(chain_id))
            .ok_or_else(|| AgentBookError::UnconfiguredChain(chain_id.clone()))
    }

    fn provider(&self, chain_id: &ChainId) -> Result<Arc<RootProvider>, AgentBookError> {
        if let Some(existing) = self.providers.get(chain_id) {
            return Ok(Arc::clone(existing.value()));
        }
        let url = self
            .rpc_urls
            .get(chain_id)
            .cloned()
            .ok_or_else(|| AgentBookError::NoRpcConfigured(chain_id.clone()))?;
        let provider = Arc::new(ProviderBuilder::new().connect_http(url));
        self.providers.entry(chain_id.clone()).or_insert_with(|| Arc::clone(&provider));
        Ok(provider)
    }

    /// Looks up the human identifier registered for `wallet_address` on
    /// `chain_id`. A `0` on-chain return, or any RPC/encoding failure, maps
    /// to `Ok(None)` — only configuration errors propagate.
    #[tracing::instrument(skip(self), fields(%chain_id))]
    pub async fn lookup_human(
        &self,
        wallet_address: &str,
        chain_id: &ChainId,
    ) -> Result<Option<HumanId>, AgentBookError> {
        let contract_address = self.contract_address(chain_id)?;
        let provider = self.provider(chain_id)?;

        let wallet = match Address::from_str(wallet_address) {
            Ok(address) => address,
            Err(_) => {
                tracing::warn!(wallet_address, "malformed wallet address, treating as unregistered");
                return Ok(None);
            }
        };

        let contract = AgentBookContract::new(contract_address, &*provider);
        match contract.lookupHuman(wallet).call().await {
            Ok(id) if id.is_zero() => Ok(None),
            Ok(id) => Ok(Some(HumanId(format!("{:#x}", id)))),
            Err(error) => {
                tracing::warn!(%error, "AgentBook RPC call failed, treating as unregistered");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_deployment_table_is_empty_at_inception() {
        assert!(BUILTIN_DEPLOYMENTS.is_empty());
        let chain_id = ChainId::new("eip155", "8453");
        assert!(builtin_deployment(&chain_id).is_none());
    }

    #[tokio::test]
    async fn lookup_fails_loudly_on_unconfigured_chain() {
        let agentbook = AgentBook::new(HashMap::new(), HashMap::new());
        let chain_id = ChainId::new("eip155", "8453");
        let err = agentbook
            .lookup_human("0x1111111111111111111111111111111111111111", &chain_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentBookError::UnconfiguredChain(_)));
    }

    #[tokio::test]
    async fn lookup_fails_loudly_on_missing_rpc_even_with_contract_override() {
        let mut overrides = HashMap::new();
        let chain_id = ChainId::new("eip155", "8453");
        overrides.insert(
            chain_id.clone(),
            Address::from_str("0x2222222222222222222222222222222222222222").unwrap(),
        );
        let agentbook = AgentBook::new(overrides, HashMap::new());
        let err = agentbook
            .lookup_human("0x1111111111111111111111111111111111111111", &chain_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentBookError::NoRpcConfigured(_)));
    }
}
