//! EVM chain codec: EIP-4361 "Sign-In With Ethereum" message assembly and
//! EIP-191 personal-sign verification.
//!
//! The canonical message text follows the same field order as
//! `alloy_siwe::Message`'s `Display` impl; recovery uses
//! `Signature::recover_address_from_msg`, which EIP-191-hashes the message
//! internally (unlike `recover_address_from_prehash`, which expects the
//! caller to have already hashed it — the form `x402-chain-eip155` uses for
//! its own EIP-3009 authorization signatures).

use agentkit_types::Payload;
use alloy_primitives::{Address, Signature};
use std::str::FromStr;

/// Errors raised while formatting or verifying an EVM SIWE message.
#[derive(Debug, thiserror::Error)]
pub enum Eip155CodecError {
    #[error("chainId reference is not a decimal EVM chain id: {0}")]
    InvalidChainReference(String),
    #[error("invalid EVM address: {0}")]
    InvalidAddress(String),
    #[error("invalid signature length")]
    InvalidSignatureLength,
    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),
}

/// Builds the canonical EIP-4361 message text for `payload`.
///
/// Returns an error if `payload.chain_id`'s reference is not a decimal EVM
/// chain id, since that is part of the text being produced.
pub fn format(payload: &Payload) -> Result<String, Eip155CodecError> {
    let chain_ref = payload.chain_id.reference();
    chain_ref
        .parse::<u64>()
        .map_err(|_| Eip155CodecError::InvalidChainReference(chain_ref.to_string()))?;

    let mut message = format!(
        "{} wants you to sign in with your Ethereum account:\n{}\n\n",
        payload.domain, payload.address
    );
    if let Some(statement) = &payload.statement {
        message.push_str(statement);
        message.push_str("\n\n");
    }
    message.push_str(&format!("URI: {}\n", payload.uri));
    message.push_str(&format!("Version: {}\n", payload.version));
    message.push_str(&format!("Chain ID: {}\n", chain_ref));
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
    Ok(message)
}

/// Recovers the signer of `message` under EIP-191 and compares it to
/// `address`. Both chains verify an asserted address rather than recovering
/// an unknown one; the comparison is what makes this a verification rather
/// than a bare recovery.
pub fn verify(message: &str, address: &str, signature: &str) -> Result<bool, Eip155CodecError> {
    let expected =
        Address::from_str(address).map_err(|e| Eip155CodecError::InvalidAddress(e.to_string()))?;

    let hex = signature.strip_prefix("0x").unwrap_or(signature);
    if hex.is_empty() {
        return Err(Eip155CodecError::InvalidSignatureLength);
    }
    let bytes =
        hex::decode(hex).map_err(|e| Eip155CodecError::InvalidSignatureEncoding(e.to_string()))?;
    if bytes.len() != 65 {
        return Err(Eip155CodecError::InvalidSignatureLength);
    }
    let sig = Signature::from_raw(&bytes)
        .map_err(|e| Eip155CodecError::InvalidSignatureEncoding(e.to_string()))?;

    match sig.recover_address_from_msg(message.as_bytes()) {
        Ok(recovered) => Ok(recovered == expected),
        Err(_) => Ok(false),
    }
}
