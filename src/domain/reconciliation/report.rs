//! Reconciliation report and result types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{detect, plan, DiscrepancyTag, ProviderSnapshot, StoreSnapshot};

/// Ephemeral comparison of one email's provider and store state.
///
/// Always derived from freshly loaded snapshots; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub email: String,
    pub provider: Option<ProviderSnapshot>,
    pub store: Option<StoreSnapshot>,
    pub tags: Vec<DiscrepancyTag>,
    pub can_reconcile: bool,
    pub actions: Vec<String>,
}

impl ReconciliationReport {
    /// Runs detection and planning over the two snapshots.
    pub fn derive(
        email: impl Into<String>,
        provider: Option<ProviderSnapshot>,
        store: Option<StoreSnapshot>,
    ) -> Self {
        let tags = detect(provider.as_ref(), store.as_ref());
        let plan = plan(&tags, provider.as_ref(), store.as_ref());
        Self {
            email: email.into(),
            provider,
            store,
            tags,
            can_reconcile: plan.can_reconcile,
            actions: plan.actions,
        }
    }

    pub fn is_in_sync(&self) -> bool {
        self.tags == [DiscrepancyTag::NoDiscrepancy]
    }

    pub fn has_tag(&self, tag: DiscrepancyTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Executor stage, reported when a run aborts part-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStep {
    LoadSnapshots,
    EnsureUser,
    UpsertMembership,
    SyncCard,
    AppendAudit,
}

impl fmt::Display for ReconciliationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReconciliationStep::LoadSnapshots => "load snapshots",
            ReconciliationStep::EnsureUser => "ensure user",
            ReconciliationStep::UpsertMembership => "upsert membership",
            ReconciliationStep::SyncCard => "sync card",
            ReconciliationStep::AppendAudit => "append audit entry",
        };
        f.write_str(s)
    }
}

/// Outcome of one executor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub success: bool,
    pub message: String,
    pub tags_addressed: Vec<DiscrepancyTag>,
    pub actions_performed: Vec<String>,
    pub user_created: bool,
    pub membership_updated: bool,
    pub card_created: bool,
    pub card_updated: bool,
}

impl ReconciliationResult {
    /// A run that stopped before writing anything.
    pub fn not_reconcilable(message: impl Into<String>, tags: Vec<DiscrepancyTag>) -> Self {
        Self {
            success: false,
            message: message.into(),
            tags_addressed: tags,
            ..Self::default()
        }
    }

    /// A run that found nothing to correct.
    pub fn already_in_sync() -> Self {
        Self {
            success: true,
            message: "Already in sync".to_string(),
            tags_addressed: vec![DiscrepancyTag::NoDiscrepancy],
            ..Self::default()
        }
    }

    /// Records one performed write.
    pub fn performed(&mut self, action: impl Into<String>) {
        self.actions_performed.push(action.into());
    }

    pub fn wrote_anything(&self) -> bool {
        self.user_created || self.membership_updated || self.card_created || self.card_updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::membership::{MembershipStatus, PlanType};
    use crate::domain::reconciliation::discrepancy::fixtures::*;

    #[test]
    fn derive_combines_detection_and_planning() {
        let report = ReconciliationReport::derive(
            "ada@example.com",
            Some(provider(MembershipStatus::Canceled, PlanType::Individual)),
            Some(store(MembershipStatus::Active, PlanType::Individual, true, true)),
        );
        assert!(report.can_reconcile);
        assert!(report.has_tag(DiscrepancyTag::StatusMismatch));
        assert!(!report.is_in_sync());
        assert_eq!(report.actions.len(), 1);
    }

    #[test]
    fn derive_without_provider_is_unreconcilable() {
        let report = ReconciliationReport::derive("ghost@example.com", None, None);
        assert_eq!(report.tags, vec![DiscrepancyTag::NoProviderCustomer]);
        assert!(!report.can_reconcile);
    }

    #[test]
    fn already_in_sync_result_is_successful_without_writes() {
        let result = ReconciliationResult::already_in_sync();
        assert!(result.success);
        assert!(!result.wrote_anything());
        assert!(result.actions_performed.is_empty());
    }
}
