//! Membership card projection.
//!
//! A card mirrors the user's current membership. Its membership number is
//! assigned once from a store counter and survives every later update.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{CardId, MembershipId, Timestamp, UserId, ValidationError};

use super::{Membership, MembershipStatus, PlanType, User};

/// Human-facing membership number, e.g. `MEM-000042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipNumber(String);

impl MembershipNumber {
    /// Formats a counter value with the configured prefix and width.
    pub fn format(prefix: &str, sequence: i64, width: usize) -> Result<Self, ValidationError> {
        if sequence <= 0 {
            return Err(ValidationError::invalid_format(
                "membership_number",
                format!("sequence must be positive, got {}", sequence),
            ));
        }
        Ok(Self(format!("{}{:0width$}", prefix, sequence, width = width)))
    }

    /// Wraps a number read back from storage or a request path.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("membership_number"));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ValidationError::invalid_format(
                "membership_number",
                "only letters, digits and '-' are allowed",
            ));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MembershipNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A member's card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipCard {
    pub id: CardId,
    pub user_id: UserId,
    pub membership_id: MembershipId,

    /// Write-once.
    pub membership_number: MembershipNumber,

    pub member_name: String,
    pub email: String,
    pub plan_type: PlanType,
    pub status: MembershipStatus,
    pub valid_from: Timestamp,
    pub valid_until: Timestamp,

    /// Opaque, QR-encodable payload checked by door staff.
    pub verification_payload: String,

    /// Reference to a rendered card document, once one exists.
    pub document_ref: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MembershipCard {
    /// Builds a fresh card for a membership.
    pub fn issue(
        number: MembershipNumber,
        user: &User,
        membership: &Membership,
        verification_payload: String,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: CardId::new(),
            user_id: user.id,
            membership_id: membership.id,
            membership_number: number,
            member_name: user.display_name.clone(),
            email: user.email.clone(),
            plan_type: membership.plan_type,
            status: membership.status,
            valid_from: membership.start_date,
            valid_until: membership.end_date,
            verification_payload,
            document_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rewrites every derived field in place. The membership number is kept.
    pub fn refresh(&mut self, user: &User, membership: &Membership, verification_payload: String) {
        self.membership_id = membership.id;
        self.member_name = user.display_name.clone();
        self.email = user.email.clone();
        self.plan_type = membership.plan_type;
        self.status = membership.status;
        self.valid_from = membership.start_date;
        self.valid_until = membership.end_date;
        self.verification_payload = verification_payload;
        self.updated_at = Timestamp::now();
    }

    /// Whether the card admits its holder at `at`.
    pub fn is_valid_at(&self, at: &Timestamp) -> bool {
        self.status.grants_access() && !at.is_before(&self.valid_from) && !at.is_after(&self.valid_until)
    }
}

/// Result of a front-of-house verification lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardVerification {
    pub valid: bool,
    pub status: MembershipStatus,
    pub plan_type: PlanType,
}
