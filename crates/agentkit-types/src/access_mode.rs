//! The three access policies a protected endpoint can be configured with.

use serde::{Deserialize, Serialize};

/// A configured access policy for a protected endpoint.
///
/// Echoed verbatim into the `agentkit` 402 extension's `mode` field so
/// clients can see what they're signing up for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AccessMode {
    /// Every verified-human agent is granted access unconditionally.
    Free,
    /// The first `uses` requests per human on this endpoint are granted for
    /// free; afterwards the normal payment flow proceeds.
    FreeTrial { uses: u32 },
    /// Verified-human agents pay a reduced amount; `uses` bounds how many
    /// discounted requests one human may make on this endpoint, or is
    /// `None` for an unbounded discount.
    Discount { percent: u8, uses: Option<u32> },
}

impl AccessMode {
    /// Validates the mode's own constraints, independent of any store.
    ///
    /// `free-trial` and `discount` both require a positive `uses` when
    /// bounded, and `discount`'s `percent` must fall in `1..=100`.
    pub fn validate(&self) -> Result<(), AccessModeError> {
        match self {
            AccessMode::Free => Ok(()),
            AccessMode::FreeTrial { uses } => {
                if *uses == 0 {
                    Err(AccessModeError::NonPositiveUses)
                } else {
                    Ok(())
                }
            }
            AccessMode::Discount { percent, uses } => {
                if *percent == 0 || *percent > 100 {
                    Err(AccessModeError::PercentOutOfRange(*percent))
                } else if matches!(uses, Some(0)) {
                    Err(AccessModeError::NonPositiveUses)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Configuration error raised when an [`AccessMode`] is malformed.
///
/// Per the fail-closed policy, this is a construction-time error, not a
/// per-request one: invalid mode configuration never reaches the request
/// hook.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccessModeError {
    #[error("free-trial/discount uses must be a positive integer")]
    NonPositiveUses,
    #[error("discount percent must be in 1..=100, got {0}")]
    PercentOutOfRange(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_always_valid() {
        assert!(AccessMode::Free.validate().is_ok());
    }

    #[test]
    fn free_trial_rejects_zero_uses() {
        let mode = AccessMode::FreeTrial { uses: 0 };
        assert_eq!(mode.validate(), Err(AccessModeError::NonPositiveUses));
    }

    #[test]
    fn discount_rejects_out_of_range_percent() {
        let mode = AccessMode::Discount { percent: 0, uses: None };
        assert_eq!(mode.validate(), Err(AccessModeError::PercentOutOfRange(0)));
        let mode = AccessMode::Discount { percent: 101, uses: None };
        assert_eq!(mode.validate(), Err(AccessModeError::PercentOutOfRange(101)));
    }

    #[test]
    fn discount_allows_unbounded_uses() {
        let mode = AccessMode::Discount { percent: 50, uses: None };
        assert!(mode.validate().is_ok());
    }

    #[test]
    fn serializes_tagged_by_type() {
        let mode = AccessMode::FreeTrial { uses: 2 };
        let json = serde_json::to_value(&mode).unwrap();
        assert_eq!(json["type"], "free-trial");
        assert_eq!(json["uses"], 2);
    }
}
