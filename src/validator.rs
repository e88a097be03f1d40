//! Message validator: domain binding, URI origin match, temporal bounds, and
//! nonce freshness for a parsed challenge payload.
//!
//! Every check here is pure CPU work except the optional nonce check, which
//! may suspend on I/O (the usage store's `hasUsedNonce`, when present, can be
//! a remote call). The function itself never panics: every failure reason is
//! a variant of [`MessageValidationError`], returned, not thrown.

use agentkit_types::Payload;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Default window for how old a challenge's `issuedAt` may be.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

/// Reason a payload failed validation.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MessageValidationError {
    #[error("payload domain {payload} does not match resource hostname {expected}")]
    DomainMismatch { payload: String, expected: String },
    #[error("payload uri origin {payload} does not match resource origin {expected}")]
    OriginMismatch { payload: String, expected: String },
    #[error("payload uri is not a valid URI: {0}")]
    InvalidPayloadUri(String),
    #[error("resource uri is not a valid URI: {0}")]
    InvalidResourceUri(String),
    #[error("issuedAt is not a parseable ISO-8601 timestamp")]
    IssuedAtUnparseable,
    #[error("issuedAt is in the future")]
    IssuedAtInFuture,
    #[error("issuedAt is older than the allowed window")]
    IssuedAtTooOld,
    #[error("expirationTime is not a parseable ISO-8601 timestamp")]
    ExpirationUnparseable,
    #[error("expirationTime is in the past")]
    Expired,
    #[error("notBefore is not a parseable ISO-8601 timestamp")]
    NotBeforeUnparseable,
    #[error("notBefore is in the future")]
    NotYetValid,
    #[error("nonce has already been seen")]
    NonceReplayed,
}

/// Asynchronous hook for replay protection; implemented by the usage store's
/// optional nonce set. Validation calls this but never consumes it —
/// consuming the nonce is the request hook's job, performed only after
/// signature verification succeeds.
#[async_trait::async_trait]
pub trait NonceChecker: Send + Sync {
    async fn has_used(&self, nonce: &str) -> bool;
}

/// Validates `payload` against the full URI of the resource being requested.
///
/// `max_age` bounds how old `issuedAt` may be; pass [`DEFAULT_MAX_AGE`] for
/// the default five-minute window. `nonce_checker` is `None` when the store
/// has no replay guard configured.
pub async fn validate(
    payload: &Payload,
    resource_uri: &str,
    max_age: Duration,
    nonce_checker: Option<&dyn NonceChecker>,
) -> Result<(), MessageValidationError> {
    let resource = url::Url::parse(resource_uri)
        .map_err(|e| MessageValidationError::InvalidResourceUri(e.to_string()))?;
    let payload_uri = url::Url::parse(&payload.uri)
        .map_err(|e| MessageValidationError::InvalidPayloadUri(e.to_string()))?;

    let expected_host = resource.host_str().unwrap_or_default();
    if payload.domain != expected_host {
        return Err(MessageValidationError::DomainMismatch {
            payload: payload.domain.clone(),
            expected: expected_host.to_string(),
        });
    }

    if payload_uri.origin() != resource.origin() {
        return Err(MessageValidationError::OriginMismatch {
            payload: payload_uri.origin().ascii_serialization(),
            expected: resource.origin().ascii_serialization(),
        });
    }

    let now = OffsetDateTime::now_utc();

    let issued_at = OffsetDateTime::parse(&payload.issued_at, &Rfc3339)
        .map_err(|_| MessageValidationError::IssuedAtUnparseable)?;
    if issued_at > now {
        return Err(MessageValidationError::IssuedAtInFuture);
    }
    if now - issued_at > max_age {
        return Err(MessageValidationError::IssuedAtTooOld);
    }

    if let Some(expiration_time) = &payload.expiration_time {
        let expiration = OffsetDateTime::parse(expiration_time, &Rfc3339)
            .map_err(|_| MessageValidationError::ExpirationUnparseable)?;
        if expiration < now {
            return Err(MessageValidationError::Expired);
        }
    }

    if let Some(not_before) = &payload.not_before {
        let not_before = OffsetDateTime::parse(not_before, &Rfc3339)
            .map_err(|_| MessageValidationError::NotBeforeUnparseable)?;
        if not_before > now {
            return Err(MessageValidationError::NotYetValid);
        }
    }

    if let Some(checker) = nonce_checker {
        if checker.has_used(&payload.nonce).await {
            return Err(MessageValidationError::NonceReplayed);
        }
    }

    Ok(())
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
            issued_at: OffsetDateTime::now_utc().format(&Rfc3339).unwrap(),
            expiration_time: None,
            not_before: None,
            request_id: None,
            resources: Some(vec!["https://api.x/data".into()]),
            statement: None,
            signature_scheme: None,
            signature: "0xsig".into(),
        }
    }

    #[tokio::test]
    async fn accepts_matching_domain_and_origin() {
        let payload = sample_payload();
        let result = validate(&payload, "https://api.x/data", DEFAULT_MAX_AGE, None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn rejects_domain_mismatch() {
        let mut payload = sample_payload();
        payload.domain = "evil.example".into();
        let result = validate(&payload, "https://api.x/data", DEFAULT_MAX_AGE, None).await;
        assert!(matches!(result, Err(MessageValidationError::DomainMismatch { .. })));
    }

    #[tokio::test]
    async fn rejects_origin_mismatch_even_with_matching_domain() {
        // Same host, different scheme -> different origin.
        let mut payload = sample_payload();
        payload.uri = "http://api.x/data".into();
        let result = validate(&payload, "https://api.x/data", DEFAULT_MAX_AGE, None).await;
        assert!(matches!(result, Err(MessageValidationError::OriginMismatch { .. })));
    }

    #[tokio::test]
    async fn rejects_issued_at_too_old() {
        let mut payload = sample_payload();
        payload.issued_at = (OffsetDateTime::now_utc() - Duration::from_secs(600))
            .format(&Rfc3339)
            .unwrap();
        let result = validate(&payload, "https://api.x/data", DEFAULT_MAX_AGE, None).await;
        assert!(matches!(result, Err(MessageValidationError::IssuedAtTooOld)));
    }

    #[tokio::test]
    async fn rejects_issued_at_in_future() {
        let mut payload = sample_payload();
        payload.issued_at = (OffsetDateTime::now_utc() + Duration::from_secs(60))
            .format(&Rfc3339)
            .unwrap();
        let result = validate(&payload, "https://api.x/data", DEFAULT_MAX_AGE, None).await;
        assert!(matches!(result, Err(MessageValidationError::IssuedAtInFuture)));
    }

    #[tokio::test]
    async fn rejects_expired_message() {
        let mut payload = sample_payload();
        payload.expiration_time = Some(
            (OffsetDateTime::now_utc() - Duration::from_secs(60))
                .format(&Rfc3339)
                .unwrap(),
        );
        let result = validate(&payload, "https://api.x/data", DEFAULT_MAX_AGE, None).await;
        assert!(matches!(result, Err(MessageValidationError::Expired)));
    }

    #[tokio::test]
    async fn rejects_not_yet_valid_message() {
        let mut payload = sample_payload();
        payload.not_before = Some(
            (OffsetDateTime::now_utc() + Duration::from_secs(60))
                .format(&Rfc3339)
                .unwrap(),
        );
        let result = validate(&payload, "https://api.x/data", DEFAULT_MAX_AGE, None).await;
        assert!(matches!(result, Err(MessageValidationError::NotYetValid)));
    }

    struct AlwaysSeen;
    #[async_trait::async_trait]
    impl NonceChecker for AlwaysSeen {
        async fn has_used(&self, _nonce: &str) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn rejects_replayed_nonce() {
        let payload = sample_payload();
        let checker = AlwaysSeen;
        let result = validate(&payload, "https://api.x/data", DEFAULT_MAX_AGE, Some(&checker)).await;
        assert!(matches!(result, Err(MessageValidationError::NonceReplayed)));
    }
}
