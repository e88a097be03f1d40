//! The opaque human identifier the AgentBook returns for a registered wallet.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, per-person identifier, non-zero by construction.
///
/// The AgentBook's `lookupHuman` view call returns a `uint256`; a zero return
/// means "not registered" and is represented as `Option::None` by callers
/// rather than as a `HumanId`. Everywhere else the identifier is carried as
/// the lowercase hex string the contract call was decoded into, so that two
/// wallets resolving to the same person compare equal and hash identically
/// when used as a usage-counter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HumanId(pub String);

impl HumanId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HumanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for HumanId {
    fn from(value: String) -> Self {
        HumanId(value)
    }
}
