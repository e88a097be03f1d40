//! Signature verifier: dispatches on `chainId` prefix to the matching chain
//! codec, assembles the canonical message from the payload, and
//! recovers/confirms the signer.
//!
//! The EVM path is pluggable: a caller that wants EIP-1271 (contract-wallet
//! `isValidSignature`) or EIP-6492 (counterfactual wallets) support supplies
//! an [`EvmVerifier`] that speaks to an RPC node, mirroring
//! `x402-chain-eip155`'s own `StructuredSignature`/`Sig6492` fallback pattern
//! (`src/scheme/v1_eip155_exact/mod.rs`). The Solana path has no such
//! extension point — it's a single offline Ed25519 check.

use crate::chain::{eip155, solana};
use agentkit_types::{Payload, SignatureFamily};
use std::sync::Arc;

/// Errors raised while verifying a payload's signature.
#[derive(Debug, thiserror::Error)]
pub enum SignatureVerifyError {
    #[error("Unsupported chain namespace: {0}")]
    UnsupportedNamespace(String),
    #[error("payload type {kind:?} does not match chain namespace {namespace}")]
    TypeNamespaceMismatch {
        kind: SignatureFamily,
        namespace: String,
    },
    #[error(transparent)]
    Eip155(#[from] eip155::Eip155CodecError),
    #[error(transparent)]
    Solana(#[from] solana::SolanaCodecError),
    #[error("signature does not recover to the asserted address")]
    SignatureInvalid,
}

/// A pluggable EVM verifier. The default implementation recovers the signer
/// under EIP-191 and compares to the asserted address; it cannot validate
/// EIP-1271/6492 signatures because those require an RPC round-trip.
#[async_trait::async_trait]
pub trait EvmVerifier: Send + Sync {
    async fn verify(&self, message: &str, address: &str, signature: &str) -> Result<bool, SignatureVerifyError>;
}

/// The offline EIP-191 verifier used when no custom [`EvmVerifier`] is
/// configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEip191Verifier;

#[async_trait::async_trait]
impl EvmVerifier for DefaultEip191Verifier {
    async fn verify(&self, message: &str, address: &str, signature: &str) -> Result<bool, SignatureVerifyError> {
        Ok(eip155::verify(message, address, signature)?)
    }
}

/// Dispatches `chainId` to the right chain codec and confirms the signer.
///
/// `address` on success is echoed from the payload — both chains verify an
/// asserted address rather than recover an unknown one; recovery-and-compare
/// semantics hold inside the EVM codec.
#[derive(Clone)]
pub struct SignatureVerifier {
    evm_verifier: Arc<dyn EvmVerifier>,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self {
            evm_verifier: Arc::new(DefaultEip191Verifier),
        }
    }
}

impl SignatureVerifier {
    /// Builds a verifier with a caller-supplied EVM verification strategy,
    /// e.g. one that also drives EIP-1271/EIP-6492 checks against a node.
    pub fn with_evm_verifier(evm_verifier: Arc<dyn EvmVerifier>) -> Self {
        Self { evm_verifier }
    }

    #[tracing::instrument(skip(self, payload), fields(chain_id = %payload.chain_id))]
    pub async fn verify(&self, payload: &Payload) -> Result<String, SignatureVerifyError> {
        let namespace = payload.chain_id.namespace();

        let valid = match namespace {
            "eip155" | "solana" if payload.kind.expected_namespace() != namespace => {
                return Err(SignatureVerifyError::TypeNamespaceMismatch {
                    kind: payload.kind,
                    namespace: namespace.to_string(),
                });
            }
            "eip155" => {
                let message = eip155::format(payload)?;
                self.evm_verifier
                    .verify(&message, &payload.address, &payload.signature)
                    .await?
            }
            "solana" => {
                let message = solana::format(payload);
                solana::verify(&message, &payload.address, &payload.signature)?
            }
            other => {
                return Err(SignatureVerifyError::UnsupportedNamespace(format!(
                    "{}:{}",
                    other,
                    payload.chain_id.reference()
                )));
            }
        };

        if valid {
            tracing::debug!(address = %payload.address, "signature verified");
            Ok(payload.address.clone())
        } else {
            Err(SignatureVerifyError::SignatureInvalid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkit_types::ChainId;
    use ed25519_dalek::{Signer, SigningKey};

    fn solana_payload(address: &str) -> Payload {
        Payload {
            domain: "api.x".into(),
            address: address.into(),
            uri: "https://api.x/data".into(),
            version: "1".into(),
            chain_id: ChainId::new("solana", "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp"),
            kind: SignatureFamily::Ed25519,
            nonce: "deadbeef".into(),
            issued_at: "2026-07-26T00:00:00Z".into(),
            expiration_time: None,
            not_before: None,
            request_id: None,
            resources: None,
            statement: None,
            signature_scheme: None,
            signature: String::new(),
        }
    }

    #[tokio::test]
    async fn verifies_solana_signature_end_to_end() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let address = bs58::encode(key.verifying_key().as_bytes()).into_string();
        let mut payload = solana_payload(&address);
        let message = solana::format(&payload);
        let signature = key.sign(message.as_bytes());
        payload.signature = bs58::encode(signature.to_bytes()).into_string();

        let verifier = SignatureVerifier::default();
        let result = verifier.verify(&payload).await.unwrap();
        assert_eq!(result, address);
    }

    #[tokio::test]
    async fn rejects_type_namespace_mismatch() {
        let mut payload = solana_payload("irrelevant");
        payload.chain_id = ChainId::new("eip155", "8453");
        let verifier = SignatureVerifier::default();
        let err = verifier.verify(&payload).await.unwrap_err();
        assert!(matches!(err, SignatureVerifyError::TypeNamespaceMismatch { .. }));
    }

    #[tokio::test]
    async fn rejects_unknown_namespace() {
        let mut payload = solana_payload("irrelevant");
        payload.chain_id = ChainId::new("bitcoin", "0");
        let verifier = SignatureVerifier::default();
        let err = verifier.verify(&payload).await.unwrap_err();
        assert!(matches!(err, SignatureVerifyError::UnsupportedNamespace(_)));
    }
}
