//! Challenge declarator: builds the `agentkit` extension block attached to a
//! 402 response, and mints the server-side nonce each challenge carries.
//!
//! Mirrors `x402-axum`'s `PaymentRequiredResponse` assembly
//! (`crates/x402-axum/src/layer.rs`) — a declarative description of what the
//! caller must present, not a live object with behavior.

use agentkit_types::{AccessMode, ChainId, SupportedChainDescriptor};
use rand::RngCore;
use serde::Serialize;

/// One supported chain a caller may challenge against, alongside the
/// signature type its namespace expects.
#[derive(Debug, Clone)]
pub struct SupportedChain {
    pub chain_id: ChainId,
}

/// The `info` section of the `agentkit` 402 extension: what the challenge
/// response expects the signed message to contain.
#[derive(Debug, Serialize)]
pub struct ChallengeInfo {
    pub domain: String,
    pub uri: String,
    pub version: String,
    pub nonce: String,
    #[serde(rename = "issuedAt")]
    pub issued_at: String,
    #[serde(rename = "expirationTime", skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    pub resources: Vec<String>,
}

/// The full `agentkit` key attached to a 402 response body.
#[derive(Debug, Serialize)]
pub struct AgentKitChallenge {
    pub info: ChallengeInfo,
    #[serde(rename = "supportedChains")]
    pub supported_chains: Vec<SupportedChainDescriptor>,
    pub schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AccessMode>,
}

/// Generates a fresh 16-byte server nonce, hex-encoded, per challenge.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The JSON Schema (draft 2020-12) describing the expected `agentkit` header
/// payload shape.
pub fn payload_schema() -> serde_json::Value {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["domain", "address", "uri", "version", "chainId", "type", "nonce", "issuedAt", "signature"],
        "properties": {
            "domain": { "type": "string" },
            "address": { "type": "string" },
            "uri": { "type": "string" },
            "version": { "type": "string" },
            "chainId": { "type": "string" },
            "type": { "type": "string", "enum": ["eip191", "ed25519"] },
            "nonce": { "type": "string" },
            "issuedAt": { "type": "string" },
            "expirationTime": { "type": "string" },
            "notBefore": { "type": "string" },
            "requestId": { "type": "string" },
            "resources": { "type": "array", "items": { "type": "string" } },
            "statement": { "type": "string" },
            "signatureScheme": { "type": "string", "enum": ["eip191", "eip1271", "eip6492", "siws"] },
            "signature": { "type": "string" }
        }
    })
}

/// Builds the `agentkit` 402 extension for a request to `resource_uri`.
///
/// `domain` is derived from `resource_uri`'s host; `uri`/`resources` echo
/// `resource_uri` itself, so the validator can confirm the signed challenge
/// targets the same resource the 402 was issued for.
pub fn declare(
    resource_uri: &str,
    statement: Option<String>,
    supported_chains: &[SupportedChain],
    mode: Option<AccessMode>,
    issued_at: String,
    expiration_time: Option<String>,
) -> Result<AgentKitChallenge, url::ParseError> {
    let parsed = url::Url::parse(resource_uri)?;
    let domain = parsed.host_str().unwrap_or_default().to_string();

    let supported_chains = supported_chains
        .iter()
        .map(|chain| SupportedChainDescriptor {
            chain_id: chain.chain_id.clone(),
            kind: match chain.chain_id.namespace() {
                "eip155" => agentkit_types::SignatureFamily::Eip191,
                _ => agentkit_types::SignatureFamily::Ed25519,
            },
            signature_scheme: None,
        })
        .collect();

    Ok(AgentKitChallenge {
        info: ChallengeInfo {
            domain,
            uri: resource_uri.to_string(),
            version: "1".to_string(),
            nonce: generate_nonce(),
            issued_at,
            expiration_time,
            statement,
            resources: vec![resource_uri.to_string()],
        },
        supported_chains,
        schema: payload_schema(),
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_distinct_32_char_hex_nonces() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn declares_domain_from_resource_uri() {
        let challenge = declare(
            "https://api.example.com/data",
            None,
            &[SupportedChain { chain_id: ChainId::new("eip155", "8453") }],
            Some(AccessMode::Free),
            "2026-07-26T00:00:00Z".to_string(),
            None,
        )
        .unwrap();

        assert_eq!(challenge.info.domain, "api.example.com");
        assert_eq!(challenge.info.resources, vec!["https://api.example.com/data"]);
        assert_eq!(challenge.supported_chains.len(), 1);
        assert!(matches!(challenge.mode, Some(AccessMode::Free)));
    }

    #[test]
    fn rejects_unparseable_resource_uri() {
        let result = declare("not a uri", None, &[], None, "2026-07-26T00:00:00Z".to_string(), None);
        assert!(result.is_err());
    }
}
