//! Chain codecs: format the canonical signed message and verify a signature
//! for one chain family, selected by a [`agentkit_types::ChainId`]'s
//! namespace.
//!
//! Namespace dispatch is closed over the two known prefixes (`eip155`,
//! `solana`). New chains are added by extending this module and the
//! AgentBook deployment table; callers cannot trigger an uncaught failure by
//! supplying an unknown `chainId` — [`crate::verifier::SignatureVerifier`]
//! reports a stable [`crate::verifier::SignatureVerifyError::UnsupportedNamespace`]
//! instead of panicking or falling through to a default codec.

pub mod eip155;
pub mod solana;
