//! Observability events the policy state machine emits.
//!
//! These are informational only — nothing downstream of the request hook
//! depends on them for correctness. They exist so the enclosing server can
//! wire them into its own logging/metrics, the same way `x402-rs`'s chain
//! providers emit `tracing` events at each state transition.

use crate::human::HumanId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HookEvent {
    AgentVerified {
        resource: String,
        address: String,
        #[serde(rename = "humanId")]
        human_id: HumanId,
    },
    AgentNotVerified {
        resource: String,
        address: String,
    },
    ValidationFailed {
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    DiscountApplied {
        resource: String,
        address: String,
        #[serde(rename = "humanId")]
        human_id: HumanId,
    },
    DiscountExhausted {
        resource: String,
        address: String,
        #[serde(rename = "humanId")]
        human_id: HumanId,
    },
}
