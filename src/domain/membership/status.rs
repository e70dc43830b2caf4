//! Membership status.
//!
//! Mirrors the billing provider's subscription states and adds the
//! club-side states (`deleted`, `complimentary`, `legacy`) that never come
//! from billing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Paid and current.
    Active,

    /// Latest payment failed; provider is retrying.
    PastDue,

    /// Subscription was canceled.
    Canceled,

    /// First payment has not completed.
    Incomplete,

    /// First payment never completed and the provider gave up.
    IncompleteExpired,

    /// In a trial period.
    Trialing,

    /// Retries exhausted without payment.
    Unpaid,

    /// Soft-deleted by an administrator.
    Deleted,

    /// Granted without payment.
    Complimentary,

    /// Carried over from the pre-billing membership register.
    Legacy,
}

impl MembershipStatus {
    /// All statuses, in declaration order.
    pub const ALL: [MembershipStatus; 10] = [
        MembershipStatus::Active,
        MembershipStatus::PastDue,
        MembershipStatus::Canceled,
        MembershipStatus::Incomplete,
        MembershipStatus::IncompleteExpired,
        MembershipStatus::Trialing,
        MembershipStatus::Unpaid,
        MembershipStatus::Deleted,
        MembershipStatus::Complimentary,
        MembershipStatus::Legacy,
    ];

    /// Terminal statuses never come back to life on the same record.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MembershipStatus::Canceled
                | MembershipStatus::IncompleteExpired
                | MembershipStatus::Deleted
        )
    }

    /// Returns true if a card with this status should be honoured at the door.
    pub fn grants_access(&self) -> bool {
        matches!(
            self,
            MembershipStatus::Active
                | MembershipStatus::PastDue
                | MembershipStatus::Trialing
                | MembershipStatus::Complimentary
                | MembershipStatus::Legacy
        )
    }

    /// Wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::PastDue => "past_due",
            MembershipStatus::Canceled => "canceled",
            MembershipStatus::Incomplete => "incomplete",
            MembershipStatus::IncompleteExpired => "incomplete_expired",
            MembershipStatus::Trialing => "trialing",
            MembershipStatus::Unpaid => "unpaid",
            MembershipStatus::Deleted => "deleted",
            MembershipStatus::Complimentary => "complimentary",
            MembershipStatus::Legacy => "legacy",
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        MembershipStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown status '{}'", s))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(MembershipStatus::Canceled.is_terminal());
        assert!(MembershipStatus::IncompleteExpired.is_terminal());
        assert!(MembershipStatus::Deleted.is_terminal());
        assert!(!MembershipStatus::PastDue.is_terminal());
        assert!(!MembershipStatus::Legacy.is_terminal());
    }

    #[test]
    fn access_is_granted_for_paying_and_granted_statuses() {
        assert!(MembershipStatus::Active.grants_access());
        assert!(MembershipStatus::Complimentary.grants_access());
        assert!(!MembershipStatus::Unpaid.grants_access());
        assert!(!MembershipStatus::Deleted.grants_access());
    }

    #[test]
    fn parses_every_wire_name() {
        for status in MembershipStatus::ALL {
            assert_eq!(status.as_str().parse::<MembershipStatus>().unwrap(), status);
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!("PAST_DUE".parse::<MembershipStatus>().unwrap(), MembershipStatus::PastDue);
        assert!("paused".parse::<MembershipStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&MembershipStatus::IncompleteExpired).unwrap();
        assert_eq!(json, "\"incomplete_expired\"");
    }
}
