#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Axum integration for the AgentKit request hook.
//!
//! [`AgentKitLayer`] wraps a protected route the same shape
//! `X402Middleware`/`X402MiddlewareService` does in the sibling `x402-axum`
//! crate: it intercepts the request, runs `agentkit::policy::PolicyEngine`'s
//! request hook, and forwards to the inner service either way — this crate
//! never itself charges for a request. A grant is communicated to whatever
//! payment-enforcing layer sits further inside the stack (typically
//! `x402-axum`'s own middleware) through a request extension,
//! [`AgentKitGrant`]; that inner layer's own contract is to skip charging
//! when it finds one. This crate does not take a dependency on any concrete
//! payment middleware — it only defines the extension both sides agree on.
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use axum::response::IntoResponse;
//! use http::StatusCode;
//! use std::sync::Arc;
//! use agentkit::{AccessMode, AgentBook, InMemoryUsageStore, PolicyEngine, SignatureVerifier};
//! use agentkit_axum::AgentKitLayer;
//!
//! let policy = Arc::new(
//!     PolicyEngine::new(
//!         AccessMode::FreeTrial { uses: 3 },
//!         SignatureVerifier::default(),
//!         Arc::new(AgentBook::new(Default::default(), Default::default())),
//!         Arc::new(InMemoryUsageStore::new()),
//!     )
//!     .unwrap(),
//! );
//!
//! let app: Router = Router::new().route(
//!     "/data",
//!     get(my_handler).layer(AgentKitLayer::new(policy)),
//! );
//!
//! async fn my_handler() -> impl IntoResponse {
//!     (StatusCode::OK, "hello")
//! }
//! ```

pub mod challenge_response;
pub mod facilitator;
pub mod layer;

pub use challenge_response::AgentKitChallengeResponse;
pub use facilitator::{VerifyFailureRequest, VerifyFailureResponse, verify_failure};
pub use layer::{AgentKitGrant, AgentKitLayer, AgentKitMiddlewareService};
