//! The CAIP-122 challenge payload a client signs and returns.

use crate::chain_id::ChainId;
use serde::{Deserialize, Serialize};

/// The signature family a [`SignatureFamily`] namespace dispatches to.
///
/// `eip191` is the EVM personal-sign scheme; `ed25519` is Solana's detached
/// signature scheme. `payload.type` must match the namespace of
/// `payload.chainId` (`eip191` ↔ `eip155`, `ed25519` ↔ `solana`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureFamily {
    Eip191,
    Ed25519,
}

impl SignatureFamily {
    /// The chain namespace this signature family is expected to pair with.
    pub fn expected_namespace(&self) -> &'static str {
        match self {
            SignatureFamily::Eip191 => "eip155",
            SignatureFamily::Ed25519 => "solana",
        }
    }
}

/// An optional hint about which EVM verification scheme produced the
/// signature. Only `eip191` is handled by the default offline verifier;
/// `eip1271` and `eip6492` require a caller-supplied, RPC-capable verifier.
/// `siws` is carried for symmetry on the Solana side, where there is only
/// one scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    Eip191,
    Eip1271,
    Eip6492,
    Siws,
}

/// The parsed, not-yet-validated challenge payload carried base64-encoded in
/// the `agentkit` request header.
///
/// Field names follow the wire (camelCase) shape exactly; this type performs
/// no validation of its own beyond what `#[serde]` derives from required
/// fields and the two closed enums above — domain binding, temporal bounds,
/// and signature verification happen downstream, in the message validator
/// and the signature verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub domain: String,
    pub address: String,
    pub uri: String,
    pub version: String,
    #[serde(rename = "chainId")]
    pub chain_id: ChainId,
    #[serde(rename = "type")]
    pub kind: SignatureFamily,
    pub nonce: String,
    #[serde(rename = "issuedAt")]
    pub issued_at: String,
    #[serde(rename = "expirationTime", skip_serializing_if = "Option::is_none", default)]
    pub expiration_time: Option<String>,
    #[serde(rename = "notBefore", skip_serializing_if = "Option::is_none", default)]
    pub not_before: Option<String>,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none", default)]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub resources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub statement: Option<String>,
    #[serde(rename = "signatureScheme", skip_serializing_if = "Option::is_none", default)]
    pub signature_scheme: Option<SignatureScheme>,
    pub signature: String,
}

/// A chain this server accepts challenges for, advertised in the 402
/// response's `supportedChains` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedChainDescriptor {
    #[serde(rename = "chainId")]
    pub chain_id: ChainId,
    #[serde(rename = "type")]
    pub kind: SignatureFamily,
    #[serde(rename = "signatureScheme", skip_serializing_if = "Option::is_none", default)]
    pub signature_scheme: Option<SignatureScheme>,
}
