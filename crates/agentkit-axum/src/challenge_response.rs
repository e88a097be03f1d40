//! Turns an [`agentkit::challenge::AgentKitChallenge`] into the `402
//! Payment Required` HTTP response it's attached to, mirroring
//! `x402_axum::layer::X402Error`'s `IntoResponse` impl.

use agentkit::challenge::AgentKitChallenge;
use axum_core::body::Body;
use axum_core::response::{IntoResponse, Response};
use http::StatusCode;

/// Wraps an `agentkit` 402 extension block so it can be returned directly
/// from an Axum handler.
///
/// A deployment using only AgentKit (no separate x402 payment scheme for
/// the protected route) returns this whenever the request hook reports "no
/// decision"; one layering `agentkit-axum` alongside `x402-axum` instead
/// merges this block into its own `PaymentRequiredResponse` body under the
/// `agentkit` key.
#[derive(Debug)]
pub struct AgentKitChallengeResponse(pub AgentKitChallenge);

impl AgentKitChallengeResponse {
    pub fn new(challenge: AgentKitChallenge) -> Self {
        Self(challenge)
    }
}

impl IntoResponse for AgentKitChallengeResponse {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "agentkit": self.0 });
        let bytes = serde_json::to_vec(&body).expect("challenge response serialization is infallible");
        Response::builder()
            .status(StatusCode::PAYMENT_REQUIRED)
            .header("Content-Type", "application/json")
            .body(Body::from(bytes))
            .expect("failed to construct 402 response")
    }
}
