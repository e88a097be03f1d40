//! Wire types and a plain async entry point for the facilitator's
//! verify-failure callback (discount mode only).
//!
//! This is deliberately not an Axum handler itself: the facilitator is an
//! external service reachable over whatever transport a deployment chooses.
//! An application wires [`verify_failure`] into a route with a thin
//! `async fn(State<Arc<PolicyEngine>>, Json<VerifyFailureRequest>) ->
//! Json<VerifyFailureResponse>` handler.

use agentkit::policy::{PolicyEngine, VerifyFailureOutcome};
use serde::{Deserialize, Serialize};

/// The facilitator's verify-failure callback payload.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyFailureRequest {
    /// Path of the protected resource the original payment targeted.
    pub resource_path: String,
    /// The original payment payload (EIP-3009 or Permit2 shaped).
    pub payment_payload: serde_json::Value,
    /// The facilitator's declared required amount, as an integer string.
    pub required_amount: String,
    /// The error the facilitator's own verification failed with.
    pub facilitator_error: String,
}

/// The decision returned to the facilitator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyFailureResponse {
    NoDecision,
    Recovered {
        payer: String,
        #[serde(rename = "newRequiredAmount")]
        new_required_amount: String,
    },
}

/// Runs [`PolicyEngine::verify_failure_hook`] and maps the result to the
/// wire type above, logging the emitted hook event (if any) along the way.
pub async fn verify_failure(policy: &PolicyEngine, request: VerifyFailureRequest) -> VerifyFailureResponse {
    let result = policy
        .verify_failure_hook(
            &request.resource_path,
            &request.payment_payload,
            &request.required_amount,
            &request.facilitator_error,
        )
        .await;

    if let Some(event) = &result.event {
        tracing::info!(?event, "agentkit verify-failure hook");
    }

    match result.outcome {
        VerifyFailureOutcome::NoDecision => VerifyFailureResponse::NoDecision,
        VerifyFailureOutcome::Recovered { payer, new_required_amount } => {
            VerifyFailureResponse::Recovered { payer, new_required_amount }
        }
    }
}
