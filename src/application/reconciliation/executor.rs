//! ReconciliationExecutor - applies a freshly derived report to the store.
//!
//! Steps run strictly in order: user, membership, card, audit. Each write
//! is keyed by a natural key, so a failed run is repaired by running again.
//! Nothing is retried automatically.

use std::sync::Arc;

use serde_json::json;

use crate::application::card_lifecycle::{CardContext, CardOutcome, MembershipCardLifecycle};
use crate::domain::membership::{
    normalize_email, AuditAction, AuditLogEntry, BillingTerms, EngineError, Membership, User,
};
use crate::domain::reconciliation::{
    DiscrepancyTag, ProviderSnapshot, ReconciliationReport, ReconciliationResult,
    ReconciliationStep,
};
use crate::ports::{RecordStore, SaveResult};

use super::SnapshotLoader;

pub struct ReconciliationExecutor {
    snapshots: SnapshotLoader,
    store: RecordStore,
    cards: Arc<MembershipCardLifecycle>,
}

impl ReconciliationExecutor {
    pub fn new(
        snapshots: SnapshotLoader,
        store: RecordStore,
        cards: Arc<MembershipCardLifecycle>,
    ) -> Self {
        Self {
            snapshots,
            store,
            cards,
        }
    }

    /// Builds a report from freshly loaded snapshots. Never writes.
    #[tracing::instrument(skip(self))]
    pub async fn validate(&self, email: &str) -> Result<ReconciliationReport, EngineError> {
        let email = normalize_email(email)?;
        let (provider, store) = self.snapshots.load(&email).await?;
        let report = ReconciliationReport::derive(email, provider, store);
        tracing::debug!(tags = ?report.tags, can_reconcile = report.can_reconcile, "Reconciliation report");
        Ok(report)
    }

    /// Makes the store match the provider for one email.
    ///
    /// `actor_id` is `None` for system-initiated runs (webhooks).
    ///
    /// # Errors
    ///
    /// - `ReconciliationAborted` when a write fails; `partial` shows what
    ///   was already committed
    /// - any error from loading the snapshots
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(
        &self,
        email: &str,
        actor_id: Option<&str>,
    ) -> Result<ReconciliationResult, EngineError> {
        let report = self.validate(email).await?;

        if report.is_in_sync() {
            tracing::info!(email = %report.email, "Already in sync");
            return self.link_in_sync_user(&report, actor_id).await;
        }
        let Some(provider) = report.provider.as_ref().filter(|_| report.can_reconcile) else {
            let message = if report.has_tag(DiscrepancyTag::NoProviderCustomer) {
                format!("No billing subscription found for {}", report.email)
            } else {
                format!("Nothing to reconcile for {}", report.email)
            };
            tracing::info!(email = %report.email, tags = ?report.tags, "Not reconcilable");
            return Ok(ReconciliationResult::not_reconcilable(message, report.tags.clone()));
        };

        let mut result = ReconciliationResult {
            tags_addressed: report.tags.clone(),
            ..ReconciliationResult::default()
        };

        let user = self
            .ensure_user(&report, provider, &mut result)
            .await
            .map_err(|e| aborted(ReconciliationStep::EnsureUser, e, &result))?;
        let membership = self
            .upsert_membership(&user, provider, &mut result)
            .await
            .map_err(|e| aborted(ReconciliationStep::UpsertMembership, e, &result))?;
        self.sync_card(&user, &membership, &mut result)
            .await
            .map_err(|e| aborted(ReconciliationStep::SyncCard, e, &result))?;
        self.append_audit(&user, &report, actor_id, &result)
            .await
            .map_err(|e| aborted(ReconciliationStep::AppendAudit, e, &result))?;

        result.success = true;
        result.message = format!(
            "Reconciled {}: {} action(s) performed",
            report.email,
            result.actions_performed.len()
        );
        tracing::info!(
            email = %report.email,
            actions = result.actions_performed.len(),
            user_created = result.user_created,
            card_created = result.card_created,
            "Reconciliation complete"
        );
        Ok(result)
    }

    /// Records already match billing; only the user's customer link may be
    /// missing. Writing it is audited like any other reconciliation.
    async fn link_in_sync_user(
        &self,
        report: &ReconciliationReport,
        actor_id: Option<&str>,
    ) -> Result<ReconciliationResult, EngineError> {
        let mut result = ReconciliationResult::already_in_sync();
        let (Some(provider), Some(store)) = (&report.provider, &report.store) else {
            return Ok(result);
        };
        if store.user.billing_customer_id.as_deref() == Some(provider.customer_id.as_str()) {
            return Ok(result);
        }

        let user = self
            .ensure_user(report, provider, &mut result)
            .await
            .map_err(|e| aborted(ReconciliationStep::EnsureUser, e, &result))?;
        self.append_audit(&user, report, actor_id, &result)
            .await
            .map_err(|e| aborted(ReconciliationStep::AppendAudit, e, &result))?;
        result.message = format!(
            "Already in sync; linked {} to customer {}",
            user.email, provider.customer_id
        );
        Ok(result)
    }

    async fn ensure_user(
        &self,
        report: &ReconciliationReport,
        provider: &ProviderSnapshot,
        result: &mut ReconciliationResult,
    ) -> Result<User, EngineError> {
        if let Some(store) = &report.store {
            let mut user = store.user.clone();
            if user.billing_customer_id.as_deref() != Some(provider.customer_id.as_str()) {
                user.billing_customer_id = Some(provider.customer_id.clone());
                self.store.users.update(&user).await?;
                result.performed(format!(
                    "Linked user {} to customer {}",
                    user.email, provider.customer_id
                ));
            }
            return Ok(user);
        }

        let name = provider.name.clone().unwrap_or_default();
        let user = User::new(&report.email, name, Some(provider.customer_id.clone()))?;
        match self.store.users.insert(&user).await? {
            SaveResult::Inserted => {
                result.user_created = true;
                result.performed(format!(
                    "Created user {} linked to customer {}",
                    user.email, provider.customer_id
                ));
                Ok(user)
            }
            SaveResult::AlreadyExists => self
                .store
                .users
                .find_by_email(&user.email)
                .await?
                .ok_or_else(|| EngineError::not_found("User", &user.email)),
        }
    }

    async fn upsert_membership(
        &self,
        user: &User,
        provider: &ProviderSnapshot,
        result: &mut ReconciliationResult,
    ) -> Result<Membership, EngineError> {
        let terms = BillingTerms {
            plan_type: provider.plan_type,
            status: provider.status,
            start_date: provider.period_start,
            end_date: provider.period_end,
            auto_renew: provider.auto_renew,
        };

        let existing = self
            .store
            .memberships
            .find_by_subscription(&user.id, &provider.subscription_id)
            .await?;

        let mut membership = match existing {
            Some(m) => m,
            None => {
                let created =
                    Membership::new(user.id, Some(provider.subscription_id.clone()), terms.clone())?;
                if self.store.memberships.insert(&created).await? == SaveResult::Inserted {
                    result.membership_updated = true;
                    result.performed(format!(
                        "Created {} membership ({}) ending {}",
                        created.plan_type,
                        created.status,
                        created.end_date.date_string()
                    ));
                    return self.reload_membership(&created).await;
                }
                self.store
                    .memberships
                    .find_by_subscription(&user.id, &provider.subscription_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Membership", &provider.subscription_id))?
            }
        };

        if membership.is_deleted() {
            tracing::info!(
                membership_id = %membership.id,
                subscription_id = %provider.subscription_id,
                "Membership was deleted by an administrator; billing terms not applied"
            );
            return Ok(membership);
        }

        let before = membership.terms();
        if membership.apply_terms(&terms)? {
            self.store.memberships.update(&membership).await?;
            result.membership_updated = true;
            for action in describe_changes(&before, &terms) {
                result.performed(action);
            }
        }
        self.reload_membership(&membership).await
    }

    async fn reload_membership(&self, membership: &Membership) -> Result<Membership, EngineError> {
        self.store
            .memberships
            .find_by_id(&membership.id)
            .await?
            .ok_or_else(|| EngineError::not_found("Membership", membership.id))
    }

    async fn sync_card(
        &self,
        user: &User,
        membership: &Membership,
        result: &mut ReconciliationResult,
    ) -> Result<(), EngineError> {
        let user = self
            .store
            .users
            .find_by_id(&user.id)
            .await?
            .ok_or_else(|| EngineError::not_found("User", user.id))?;

        match self.cards.sync_card(CardContext { user: &user, membership }).await? {
            CardOutcome::Created(card) => {
                result.card_created = true;
                result.performed(format!("Created membership card {}", card.membership_number));
            }
            CardOutcome::Updated(card) => {
                result.card_updated = true;
                result.performed(format!(
                    "Updated membership card {}: {}/{} until {}",
                    card.membership_number,
                    card.status,
                    card.plan_type,
                    card.valid_until.date_string()
                ));
            }
            CardOutcome::Unchanged(_) => {}
        }
        Ok(())
    }

    async fn append_audit(
        &self,
        user: &User,
        report: &ReconciliationReport,
        actor_id: Option<&str>,
        result: &ReconciliationResult,
    ) -> Result<(), EngineError> {
        let entry = AuditLogEntry::new(
            Some(user.id),
            AuditAction::Reconciliation,
            actor_id.map(str::to_string),
            json!({
                "email": report.email,
                "tags_addressed": report.tags,
                "planned_actions": report.actions,
                "actions_performed": result.actions_performed,
                "user_created": result.user_created,
                "membership_updated": result.membership_updated,
                "card_created": result.card_created,
                "card_updated": result.card_updated,
            }),
        );
        self.store.audit_log.append(&entry).await?;
        Ok(())
    }
}

/// Wraps a step failure with the progress committed so far.
fn aborted(
    step: ReconciliationStep,
    source: EngineError,
    partial: &ReconciliationResult,
) -> EngineError {
    tracing::error!(step = %step, error = %source, "Reconciliation step failed");
    EngineError::ReconciliationAborted {
        step,
        source: Box::new(source),
        partial: Box::new(partial.clone()),
    }
}

fn describe_changes(before: &BillingTerms, after: &BillingTerms) -> Vec<String> {
    let mut actions = Vec::new();
    if before.status != after.status {
        actions.push(format!(
            "Updated membership status: {} → {}",
            before.status, after.status
        ));
    }
    if before.plan_type != after.plan_type {
        actions.push(format!(
            "Updated membership plan: {} → {}",
            before.plan_type, after.plan_type
        ));
    }
    if before.start_date != after.start_date {
        actions.push(format!(
            "Updated membership start date: {} → {}",
            before.start_date.date_string(),
            after.start_date.date_string()
        ));
    }
    if before.end_date != after.end_date {
        actions.push(format!(
            "Updated membership end date: {} → {}",
            before.end_date.date_string(),
            after.end_date.date_string()
        ));
    }
    if before.auto_renew != after.auto_renew {
        actions.push(format!(
            "Updated membership auto-renew: {} → {}",
            before.auto_renew, after.auto_renew
        ));
    }
    actions
}
