//! Encodes/decodes the base64-JSON payload carried in the `agentkit` HTTP
//! header.
//!
//! Mirrors the base64 handling in `x402_types`'s `Base64Bytes` wire helper
//! (`crates/x402-types/src/util/b64.rs`), specialized to a single JSON object
//! instead of an arbitrary byte string.

use agentkit_types::Payload;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Errors raised while decoding the `agentkit` header value.
///
/// Each variant corresponds to one of the distinct failure classes the
/// header codec must distinguish: not base64, not UTF-8 once decoded, or not
/// a well-formed/schema-matching JSON payload.
#[derive(Debug, thiserror::Error)]
pub enum HeaderCodecError {
    #[error("header value is not valid base64: {0}")]
    NotBase64(#[from] base64::DecodeError),
    #[error("decoded header value is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
    #[error("decoded header value does not match the challenge payload schema: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Parses an `agentkit` header value into a [`Payload`].
///
/// Required fields (`domain, address, uri, version, chainId, type, nonce,
/// issuedAt, signature`) and the closed `type`/`signatureScheme` enums are
/// enforced by `Payload`'s `serde::Deserialize` impl; any violation surfaces
/// as [`HeaderCodecError::InvalidJson`].
pub fn decode(header_value: &str) -> Result<Payload, HeaderCodecError> {
    let bytes = STANDARD.decode(header_value.trim())?;
    let json = String::from_utf8(bytes)?;
    let payload = serde_json::from_str(&json)?;
    Ok(payload)
}

/// Encodes a [`Payload`] into the base64-JSON form a client would send back.
///
/// Used by clients constructing a response and by this crate's own
/// round-trip tests; the request hook only ever calls [`decode`].
pub fn encode(payload: &Payload) -> String {
    let json = serde_json::to_string(payload).expect("Payload serialization is infallible");
    STANDARD.encode(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkit_types::{ChainId, SignatureFamily};

    fn sample_payload() -> Payload {
        Payload {
            domain: "api.x".into(),
            address: "0xabc".into(),
            uri: "https://api.x/data".into(),
            version: "1".into(),
            chain_id: ChainId::new("eip155", "8453"),
            kind: SignatureFamily::Eip191,
            nonce: "deadbeef".into(),
            issued_at: "2026-07-26T00:00:00Z".into(),
            expiration_time: None,
            not_before: None,
            request_id: None,
            resources: Some(vec!["https://api.x/data".into()]),
            statement: None,
            signature_scheme: None,
            signature: "0xsig".into(),
        }
    }

    #[test]
    fn round_trips_for_any_valid_payload() {
        let payload = sample_payload();
        let header = encode(&payload);
        let decoded = decode(&header).unwrap();
        assert_eq!(payload, decoded);
    }

    #[test]
    fn rejects_non_base64_input() {
        let err = decode("not base64!!! @@@").unwrap_err();
        assert!(matches!(err, HeaderCodecError::NotBase64(_)));
    }

    #[test]
    fn rejects_base64_that_is_not_json() {
        let header = STANDARD.encode(b"not json");
        let err = decode(&header).unwrap_err();
        assert!(matches!(err, HeaderCodecError::InvalidJson(_)));
    }

    #[test]
    fn rejects_json_missing_required_field() {
        let header = STANDARD.encode(b"{\"domain\":\"api.x\"}");
        let err = decode(&header).unwrap_err();
        assert!(matches!(err, HeaderCodecError::InvalidJson(_)));
    }

    #[test]
    fn rejects_unknown_signature_type() {
        let json = r#"{
            "domain":"api.x","address":"0xabc","uri":"https://api.x/data","version":"1",
            "chainId":"eip155:8453","type":"bogus","nonce":"deadbeef",
            "issuedAt":"2026-07-26T00:00:00Z","signature":"0xsig"
        }"#;
        let header = STANDARD.encode(json.as_bytes());
        let err = decode(&header).unwrap_err();
        assert!(matches!(err, HeaderCodecError::InvalidJson(_)));
    }
}
