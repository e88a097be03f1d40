//! Solana chain codec: Sign-In-With-Solana message assembly and detached
//! Ed25519 verification.
//!
//! `x402-chain-solana`'s own Solana code (`src/scheme/v1_solana_exact`) only
//! verifies fully-formed on-chain transactions via `solana-signature`; it has
//! no notion of a raw detached message signature. This codec instead follows
//! the pattern in `edwardbot-solana-chat`'s auth test suite: decode a base58
//! public key and signature with `bs58`, then verify with `ed25519-dalek`
//! directly over the UTF-8 message bytes.

use agentkit_types::Payload;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Errors raised while formatting or verifying a Solana SIWS message.
#[derive(Debug, thiserror::Error)]
pub enum SolanaCodecError {
    #[error("invalid public key length")]
    InvalidPublicKeyLength,
    #[error("invalid signature length")]
    InvalidSignatureLength,
    #[error("invalid base58 encoding: {0}")]
    InvalidEncoding(#[from] bs58::decode::Error),
    #[error("invalid ed25519 public key")]
    InvalidPublicKey,
}

/// Builds the canonical Sign-In-With-Solana message text for `payload`.
pub fn format(payload: &Payload) -> String {
    let mut message = format!(
        "{} wants you to sign in with your Solana account:\n\n{}\n",
        payload.domain, payload.address
    );
    if let Some(statement) = &payload.statement {
        message.push('\n');
        message.push_str(statement);
        message.push('\n');
    }
    message.push_str(&format!("\nURI: {}\n", payload.uri));
    message.push_str(&format!("Version: {}\n", payload.version));
    message.push_str(&format!("Chain ID: {}\n", payload.chain_id.reference()));
    message.push_str(&format!("Nonce: {}\n", payload.nonce));
    message.push_str(&format!("Issued At: {}", payload.issued_at));
    if let Some(expiration_time) = &payload.expiration_time {
        message.push_str(&format!("\nExpiration Time: {}", expiration_time));
    }
    if let Some(not_before) = &payload.not_before {
        message.push_str(&format!("\nNot Before: {}", not_before));
    }
    if let Some(request_id) = &payload.request_id {
        message.push_str(&format!("\nRequest ID: {}", request_id));
    }
    if let Some(resources) = &payload.resources {
        if !resources.is_empty() {
            message.push_str("\nResources:");
            for resource in resources {
                message.push_str(&format!("\n- {}", resource));
            }
        }
    }
    message
}

/// Base58-decodes `signature` (64 bytes) and `address` (32-byte pubkey) and
/// performs Ed25519 detached verification over the UTF-8 bytes of `message`.
///
/// Decode/length failures are errors; a well-formed but cryptographically
/// wrong signature is `Ok(false)`, not an error.
pub fn verify(message: &str, address: &str, signature: &str) -> Result<bool, SolanaCodecError> {
    let pubkey_bytes = bs58::decode(address).into_vec()?;
    if pubkey_bytes.len() != 32 {
        return Err(SolanaCodecError::InvalidPublicKeyLength);
    }
    let sig_bytes = bs58::decode(signature).into_vec()?;
    if sig_bytes.len() != 64 {
        return Err(SolanaCodecError::InvalidSignatureLength);
    }

    let pubkey_array: [u8; 32] = pubkey_bytes.try_into().expect("checked length above");
    let sig_array: [u8; 64] = sig_bytes.try_into().expect("checked length above");

    let verifying_key =
        VerifyingKey::from_bytes(&pubkey_array).map_err(|_| SolanaCodecError::InvalidPublicKey)?;
    let signature = Signature::from_bytes(&sig_array);

    Ok(verifying_key.verify(message.as_bytes(), &signature).is_ok())
}
