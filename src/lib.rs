#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Server-side extension to the [x402](https://www.x402.org) pay-per-request
//! protocol that lets a server distinguish automated traffic backed by a
//! verified human from anonymous bots, and apply one of three configurable
//! access policies: free bypass, an N-use free trial, or a percentage
//! discount.
//!
//! Agents prove personhood by signing a CAIP-122 challenge with a wallet
//! address pre-registered against an anonymous human identifier in an
//! on-chain registry (the AgentBook). Usage quotas are tracked per human per
//! protected endpoint, so multiple wallets controlled by one person share one
//! counter.
//!
//! ## Request-time flow
//!
//! 1. The server attaches an `agentkit` 402 extension ([`challenge::declare`])
//!    describing the chains it accepts and the nonce the client must sign.
//! 2. The client signs a CAIP-122 challenge and sends it back base64-encoded
//!    in the `agentkit` request header ([`header::decode`]).
//! 3. [`policy::PolicyEngine::request_hook`] parses the header, validates it
//!    against the request ([`validator::validate`]), verifies the signature
//!    ([`verifier::SignatureVerifier`]), resolves a human identifier
//!    ([`agentbook::AgentBook`]), and applies the configured
//!    [`agentkit_types::AccessMode`].
//! 4. Under discount mode, a later facilitator callback into
//!    [`policy::PolicyEngine::verify_failure_hook`] recovers a deliberately
//!    short-paid settlement.
//!
//! This crate is the request-time state machine only — minting payments,
//! settling on-chain transactions, issuing World ID proofs, and the
//! surrounding HTTP framework adapter are out of scope; see `agentkit-axum`
//! for an Axum integration built on top of this crate.
//!
//! ## Modules
//!
//! - [`chain`] - per-chain-family message codecs (EVM, Solana)
//! - [`header`] - base64-JSON codec for the `agentkit` HTTP header
//! - [`validator`] - domain binding, temporal bounds, and nonce freshness
//! - [`verifier`] - dispatches a payload to the right chain codec
//! - [`agentbook`] - resolves a wallet address to a human identifier
//! - [`store`] - usage counters, nonce replay guard, pending-discount map
//! - [`challenge`] - builds the `agentkit` 402 response extension
//! - [`policy`] - the request hook and verify-failure hook
//! - [`config`] - deserializable per-endpoint configuration

pub mod agentbook;
pub mod chain;
pub mod challenge;
pub mod config;
pub mod header;
pub mod policy;
pub mod store;
pub mod validator;
pub mod verifier;

pub use agentbook::{AgentBook, AgentBookError};
pub use challenge::{AgentKitChallenge, SupportedChain};
pub use config::{AgentKitConfig, ConfigError};
pub use header::HeaderCodecError;
pub use policy::{
    HookOutcome, PolicyConfigError, PolicyEngine, RequestHookResult, VerifyFailureHookResult,
    VerifyFailureOutcome,
};
pub use store::{InMemoryUsageStore, PendingDiscount, UsageStore, UsageStoreError};
pub use validator::MessageValidationError;
pub use verifier::{EvmVerifier, SignatureVerifier, SignatureVerifyError};

pub use agentkit_types::{AccessMode, AccessModeError, ChainId, ChainIdPattern, HookEvent, HumanId, Payload};
