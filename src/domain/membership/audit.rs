//! Append-only audit trail entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{AuditEntryId, Timestamp, UserId, ValidationError};

/// Closed set of audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    MembershipAdjustment,
    Reconciliation,
    MemberDeleted,
    BulkImport,
    RefundIssued,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::MembershipAdjustment => "MEMBERSHIP_ADJUSTMENT",
            AuditAction::Reconciliation => "RECONCILIATION",
            AuditAction::MemberDeleted => "MEMBER_DELETED",
            AuditAction::BulkImport => "BULK_IMPORT",
            AuditAction::RefundIssued => "REFUND_ISSUED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MEMBERSHIP_ADJUSTMENT" => Ok(AuditAction::MembershipAdjustment),
            "RECONCILIATION" => Ok(AuditAction::Reconciliation),
            "MEMBER_DELETED" => Ok(AuditAction::MemberDeleted),
            "BULK_IMPORT" => Ok(AuditAction::BulkImport),
            "REFUND_ISSUED" => Ok(AuditAction::RefundIssued),
            other => Err(ValidationError::invalid_format(
                "action",
                format!("unknown audit action '{}'", other),
            )),
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,

    /// `None` for actions not scoped to one user (bulk import, refunds).
    pub subject_user_id: Option<UserId>,

    pub action: AuditAction,

    /// Admin who acted; `None` for system-initiated runs (webhooks).
    pub actor_id: Option<String>,

    /// Previous/new values, reason and any action-specific fields.
    pub details: serde_json::Value,

    pub created_at: Timestamp,
}

impl AuditLogEntry {
    pub fn new(
        subject_user_id: Option<UserId>,
        action: AuditAction,
        actor_id: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            subject_user_id,
            action,
            actor_id,
            details,
            created_at: Timestamp::now(),
        }
    }
}
