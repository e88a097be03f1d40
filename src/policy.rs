//! Policy state machine: the request hook that turns a verified wallet
//! signature into an access decision, and the verify-failure hook that
//! recovers an intentional underpayment under discount mode.
//!
//! Shaped after `x402-axum`'s `X402Middleware`/`X402MiddlewareService`
//! (`crates/x402-axum/src/layer.rs`): a small struct wrapping the
//! lower-level components, exposing plain async methods an adapter (a tower
//! `Service`, an axum extractor, anything else) calls at the right point in
//! its own request lifecycle. Neither hook ever returns an error across this
//! boundary — every internal failure is caught and mapped to "no decision",
//! a deliberate fail-closed policy: a bug in verification must never turn
//! into a free pass.

use crate::agentbook::AgentBook;
use crate::header;
use crate::store::{PendingDiscount, UsageStore};
use crate::validator::{self, NonceChecker, DEFAULT_MAX_AGE};
use crate::verifier::SignatureVerifier;
use agentkit_types::{AccessMode, AccessModeError, HookEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Error raised at [`PolicyEngine::new`] construction time. The only
/// configuration errors this crate recognizes are malformed access modes;
/// everything else (unconfigured chains, storage backend failures) surfaces
/// per-request as "no decision", since it can't be known at construction
/// time which chains a given deployment will actually see.
#[derive(Debug, thiserror::Error)]
pub enum PolicyConfigError {
    #[error(transparent)]
    AccessMode(#[from] AccessModeError),
}

/// What the request hook decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    NoDecision,
    GrantAccess,
}

/// Result of the request hook: a decision plus an optional observability
/// event — the event exists for logging and metrics only, never consulted
/// for the decision itself.
#[derive(Debug)]
pub struct RequestHookResult {
    pub outcome: HookOutcome,
    pub event: Option<HookEvent>,
}

impl RequestHookResult {
    fn no_decision(event: Option<HookEvent>) -> Self {
        Self {
            outcome: HookOutcome::NoDecision,
            event,
        }
    }
}

/// What the verify-failure hook decided.
#[derive(Debug)]
pub enum VerifyFailureOutcome {
    NoDecision,
    /// The underpayment is recovered: the facilitator should treat
    /// `new_required_amount` as the adjusted requirement and re-settle
    /// against it.
    Recovered {
        payer: String,
        new_required_amount: String,
    },
}

#[derive(Debug)]
pub struct VerifyFailureHookResult {
    pub outcome: VerifyFailureOutcome,
    pub event: Option<HookEvent>,
}

/// Facilitator error reasons that indicate an underpayment rather than some
/// other failure (bad signature, expired authorization, wrong network).
/// Anything else passes the original error straight through.
const UNDERPAYMENT_REASONS: &[&str] = &[
    "invalid_exact_evm_payload_authorization_value",
    "permit2_insufficient_amount",
    "insufficient_funds",
];

/// Extracts the reason code the facilitator wire contract puts before the
/// first `:` in its error string. Fragile by construction: it couples this
/// crate to the facilitator's own error message format rather than a typed
/// reason field, but that's the only contract the facilitator offers today.
fn reason_code(error: &str) -> &str {
    error.split(':').next().unwrap_or(error).trim()
}

/// Extracts `(payer_address, paid_amount)` from a payment payload, trying
/// the EIP-3009 shape (`authorization.from`/`authorization.value`) and then
/// the Permit2 shape (`permit2Authorization.from`/
/// `permit2Authorization.permitted.amount`).
fn extract_payer_and_amount(payment_payload: &serde_json::Value) -> Option<(String, u128)> {
    if let Some(auth) = payment_payload.get("authorization") {
        let from = auth.get("from")?.as_str()?.to_string();
        let value = auth.get("value")?.as_str()?.parse::<u128>().ok()?;
        return Some((from, value));
    }
    if let Some(auth) = payment_payload.get("permit2Authorization") {
        let from = auth.get("from")?.as_str()?.to_string();
        let amount = auth.get("permitted")?.get("amount")?.as_str()?.parse::<u128>().ok()?;
        return Some((from, amount));
    }
    None
}

struct StoreNonceChecker<'a>(&'a dyn UsageStore);

#[async_trait::async_trait]
impl NonceChecker for StoreNonceChecker<'_> {
    async fn has_used(&self, nonce: &str) -> bool {
        // Fail closed: a storage error looks the same as "already used" so a
        // broken store can't be used to bypass replay protection.
        self.0.has_used_nonce(nonce).await.unwrap_or(true)
    }
}

/// Ties the chain codecs, header codec, validator, signature verifier,
/// AgentBook client, and usage store into the request hook and the
/// verify-failure hook. One instance is configured with a single
/// [`AccessMode`]; a deployment
/// offering different modes on different routes runs one `PolicyEngine` per
/// route.
pub struct PolicyEngine {
    mode: AccessMode,
    verifier: SignatureVerifier,
    agentbook: Arc<AgentBook>,
    usage_store: Arc<dyn UsageStore>,
    max_age: Duration,
}

impl PolicyEngine {
    pub fn new(
        mode: AccessMode,
        verifier: SignatureVerifier,
        agentbook: Arc<AgentBook>,
        usage_store: Arc<dyn UsageStore>,
    ) -> Result<Self, PolicyConfigError> {
        mode.validate()?;
        Ok(Self {
            mode,
            verifier,
            agentbook,
            usage_store,
            max_age: DEFAULT_MAX_AGE,
        })
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Runs on every request. `header_value` is the raw `agentkit` header, if
    /// present (the caller is responsible for case-insensitive header
    /// lookup). `resource_uri` is the full URL of the resource being
    /// requested; `resource_path` is its path component, used as the usage
    /// counter / pending-discount key.
    #[tracing::instrument(skip(self, header_value), fields(resource = resource_path))]
    pub async fn request_hook(
        &self,
        header_value: Option<&str>,
        resource_uri: &str,
        resource_path: &str,
    ) -> RequestHookResult {
        let Some(header_value) = header_value else {
            return RequestHookResult::no_decision(None);
        };

        let payload = match header::decode(header_value) {
            Ok(payload) => payload,
            Err(error) => {
                return RequestHookResult::no_decision(Some(HookEvent::ValidationFailed {
                    resource: resource_path.to_string(),
                    error: Some(error.to_string()),
                }));
            }
        };

        let nonce_checker = StoreNonceChecker(self.usage_store.as_ref());
        if let Err(error) = validator::validate(&payload, resource_uri, self.max_age, Some(&nonce_checker)).await {
            return RequestHookResult::no_decision(Some(HookEvent::ValidationFailed {
                resource: resource_path.to_string(),
                error: Some(error.to_string()),
            }));
        }

        let address = match self.verifier.verify(&payload).await {
            Ok(address) => address,
            Err(error) => {
                return RequestHookResult::no_decision(Some(HookEvent::ValidationFailed {
                    resource: resource_path.to_string(),
                    error: Some(error.to_string()),
                }));
            }
        };

        // Only a successfully verified signature reaches here. Record the
        // nonce now, before the AgentBook lookup, so a racing replay of the
        // same header can get at most one of the two requests past this
        // point.
        if let Err(error) = self.usage_store.record_nonce(&payload.nonce).await {
            tracing::warn!(%error, "failed to record nonce after successful verification");
        }

        let human_id = match self.agentbook.lookup_human(&address, &payload.chain_id).await {
            Ok(human_id) => human_id,
            Err(error) => {
                tracing::warn!(%error, "AgentBook lookup could not run; treating wallet as unregistered");
                None
            }
        };

        let Some(human_id) = human_id else {
            return RequestHookResult::no_decision(Some(HookEvent::AgentNotVerified {
                resource: resource_path.to_string(),
                address,
            }));
        };

        match &self.mode {
            AccessMode::Free => RequestHookResult {
                outcome: HookOutcome::GrantAccess,
                event: Some(HookEvent::AgentVerified {
                    resource: resource_path.to_string(),
                    address,
                    human_id: human_id.clone(),
                }),
            },
            AccessMode::FreeTrial { uses } => {
                let granted = self
                    .usage_store
                    .try_increment_if_below(resource_path, &human_id, *uses)
                    .await
                    .unwrap_or(false);
                if granted {
                    RequestHookResult {
                        outcome: HookOutcome::GrantAccess,
                        event: Some(HookEvent::AgentVerified {
                            resource: resource_path.to_string(),
                            address,
                            human_id: human_id.clone(),
                        }),
                    }
                } else {
                    RequestHookResult::no_decision(None)
                }
            }
            AccessMode::Discount { .. } => {
                let record = PendingDiscount {
                    human_id,
                    wallet_address: address.clone(),
                    created_at: Instant::now(),
                };
                if let Err(error) = self.usage_store.put_pending_discount(resource_path, &address, record).await {
                    tracing::warn!(%error, "failed to store pending-discount record");
                }
                RequestHookResult::no_decision(None)
            }
        }
    }

    /// Invoked by the payment facilitator when its own verification fails,
    /// discount mode only. `payment_payload` is the original payment payload
    /// JSON (EIP-3009 or Permit2 shaped); `required_amount` is the
    /// facilitator's declared required amount as an integer string;
    /// `facilitator_error` is the error string that caused verification to
    /// fail.
    #[tracing::instrument(skip(self, payment_payload), fields(resource = resource_path))]
    pub async fn verify_failure_hook(
        &self,
        resource_path: &str,
        payment_payload: &serde_json::Value,
        required_amount: &str,
        facilitator_error: &str,
    ) -> VerifyFailureHookResult {
        let no_decision = VerifyFailureHookResult {
            outcome: VerifyFailureOutcome::NoDecision,
            event: None,
        };

        let (percent, uses) = match &self.mode {
            AccessMode::Discount { percent, uses } => (*percent, *uses),
            _ => return no_decision,
        };

        let Some((payer, paid_amount)) = extract_payer_and_amount(payment_payload) else {
            return no_decision;
        };

        let pending = match self.usage_store.take_pending_discount(resource_path, &payer).await {
            Ok(Some(record)) => record,
            _ => return no_decision,
        };

        if !UNDERPAYMENT_REASONS.contains(&reason_code(facilitator_error)) {
            return no_decision;
        }

        let Ok(required) = required_amount.parse::<u128>() else {
            return no_decision;
        };
        let discounted_amount = required * (100 - percent as u128) / 100;

        if paid_amount < discounted_amount || paid_amount >= required {
            return no_decision;
        }

        if let Some(cap) = uses {
            let incremented = self
                .usage_store
                .try_increment_if_below(resource_path, &pending.human_id, cap)
                .await
                .unwrap_or(false);
            if !incremented {
                return VerifyFailureHookResult {
                    outcome: VerifyFailureOutcome::NoDecision,
                    event: Some(HookEvent::DiscountExhausted {
                        resource: resource_path.to_string(),
                        address: payer,
                        human_id: pending.human_id.clone(),
                    }),
                };
            }
        } else if let Err(error) = self.usage_store.increment_usage(resource_path, &pending.human_id).await {
            tracing::warn!(%error, "failed to increment usage count while recovering a discount");
        }

        VerifyFailureHookResult {
            outcome: VerifyFailureOutcome::Recovered {
                payer: payer.clone(),
                new_required_amount: paid_amount.to_string(),
            },
            event: Some(HookEvent::DiscountApplied {
                resource: resource_path.to_string(),
                address: payer,
                human_id: pending.human_id.clone(),
            }),
        }
    }
}
