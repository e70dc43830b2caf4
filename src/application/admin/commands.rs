//! Admin operation inputs and outputs.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::membership::{Membership, MembershipCard, MembershipStatus, User};

pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_AUDIT_ENTRIES: u64 = 200;

/// Administrative change to one membership. At least one of `end_date`
/// and `status` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustMembership {
    pub end_date: Option<Timestamp>,
    pub status: Option<MembershipStatus>,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteMember {
    pub reason: String,
    /// Cancel live billing subscriptions first; otherwise they block the delete.
    #[serde(default)]
    pub cancel_subscription: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletionOutcome {
    pub memberships_deleted: usize,
    pub canceled_subscriptions: Vec<String>,
}

/// One parsed row of a legacy-register import.
///
/// Fields stay textual so each row can fail validation on its own.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImportRow {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub plan_type: String,
    /// Defaults to `legacy`.
    #[serde(default)]
    pub status: Option<String>,
    /// `YYYY-MM-DD`; defaults to the import day.
    #[serde(default)]
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRowError {
    /// 1-based position in the submitted rows.
    pub row: usize,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub errors: Vec<ImportRowError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueRefund {
    pub payment_id: String,
    /// Smallest currency unit; `None` refunds in full.
    #[serde(default)]
    pub amount: Option<i64>,
    pub reason: String,
    /// Member the payment belongs to, for the audit trail.
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// A user with the membership that currently applies.
#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub user: User,
    pub membership: Option<Membership>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberPage {
    pub items: Vec<MemberSummary>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDetails {
    pub user: User,
    pub current: Option<Membership>,
    /// Every membership record, newest end date first.
    pub memberships: Vec<Membership>,
    pub card: Option<MembershipCard>,
}
