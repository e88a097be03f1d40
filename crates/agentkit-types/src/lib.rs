#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Shared wire types for the AgentKit x402 extension.
//!
//! This crate is blockchain-agnostic: it carries the data model any protected
//! endpoint exchanges with an agent (the CAIP-122 challenge payload, the
//! access modes a server can advertise, and the hook events a policy engine
//! emits) without pulling in signature verification or RPC clients. Those
//! live in the `agentkit` crate, which depends on this one.
//!
//! # Modules
//!
//! - [`chain_id`] - CAIP-2 chain identifiers and patterns
//! - [`payload`] - The signed challenge payload carried in the `agentkit` header
//! - [`access_mode`] - The three configurable access policies
//! - [`human`] - The opaque human identifier returned by the AgentBook
//! - [`events`] - Observability events emitted by the policy state machine

mod access_mode;
mod chain_id;
mod events;
mod human;
mod payload;

pub use access_mode::{AccessMode, AccessModeError};
pub use chain_id::{ChainId, ChainIdFormatError, ChainIdPattern};
pub use events::HookEvent;
pub use human::HumanId;
pub use payload::{Payload, SignatureFamily, SignatureScheme, SupportedChainDescriptor};
