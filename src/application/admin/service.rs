//! AdminMembershipService - the admin operation surface.
//!
//! Every operation authorizes the session first and appends exactly one
//! audit entry when it mutates anything.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::try_join_all;
use serde_json::json;

use crate::application::card_lifecycle::{CardContext, CardOutcome, MembershipCardLifecycle};
use crate::application::reconciliation::ReconciliationExecutor;
use crate::domain::foundation::{MembershipId, Timestamp, UserId};
use crate::domain::membership::{
    normalize_email, AuditAction, AuditLogEntry, BillingTerms, EngineError, Membership,
    MembershipStatus, PlanType, User,
};
use crate::domain::reconciliation::{ReconciliationReport, ReconciliationResult};
use crate::ports::{PaymentProviderGateway, RecordStore, Refund, RefundRequest, SaveResult};

use super::authorizer::{AdminPrincipal, Authorizer};
use super::commands::{
    AdjustMembership, DeleteMember, DeletionOutcome, ImportRow, ImportRowError, ImportSummary,
    IssueRefund, MemberDetails, MemberPage, MemberSummary, MAX_AUDIT_ENTRIES, MAX_PAGE_SIZE,
};

/// Operational limits for admin operations.
#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub import_row_limit: usize,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            import_row_limit: 1000,
        }
    }
}

pub struct AdminMembershipService {
    authorizer: Arc<dyn Authorizer>,
    store: RecordStore,
    gateway: Arc<dyn PaymentProviderGateway>,
    executor: Arc<ReconciliationExecutor>,
    cards: Arc<MembershipCardLifecycle>,
    settings: AdminSettings,
}

impl AdminMembershipService {
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        store: RecordStore,
        gateway: Arc<dyn PaymentProviderGateway>,
        executor: Arc<ReconciliationExecutor>,
        cards: Arc<MembershipCardLifecycle>,
        settings: AdminSettings,
    ) -> Self {
        Self {
            authorizer,
            store,
            gateway,
            executor,
            cards,
            settings,
        }
    }

    /// Resolves the session to an administrator.
    pub async fn verify_admin(&self, session_token: &str) -> Result<AdminPrincipal, EngineError> {
        self.authorizer.authorize(session_token).await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reads
    // ════════════════════════════════════════════════════════════════════════════

    /// Paged search over email and display name. `page` is 1-based.
    #[tracing::instrument(skip(self, session_token))]
    pub async fn search_members(
        &self,
        session_token: &str,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<MemberPage, EngineError> {
        self.verify_admin(session_token).await?;
        if page == 0 {
            return Err(EngineError::validation("page", "Page numbers start at 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(EngineError::validation(
                "page_size",
                format!("Page size must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }

        let offset = u64::from(page - 1) * u64::from(page_size);
        let found = self
            .store
            .users
            .search(query.trim(), offset, u64::from(page_size))
            .await?;

        let mut items = Vec::with_capacity(found.items.len());
        for user in found.items {
            let memberships = self.store.memberships.list_for_user(&user.id).await?;
            let membership = Membership::select_current(&memberships).cloned();
            items.push(MemberSummary { user, membership });
        }

        Ok(MemberPage {
            items,
            total: found.total,
            page,
            page_size,
        })
    }

    pub async fn get_member(
        &self,
        session_token: &str,
        user_id: &UserId,
    ) -> Result<MemberDetails, EngineError> {
        self.verify_admin(session_token).await?;
        let user = self.load_user(user_id).await?;
        let memberships = self.store.memberships.list_for_user(user_id).await?;
        let current = Membership::select_current(&memberships).cloned();
        let card = self.store.cards.find_by_user(user_id).await?;

        Ok(MemberDetails {
            user,
            current,
            memberships,
            card,
        })
    }

    /// Audit trail, newest first. `limit` is clamped to a sane window.
    pub async fn list_audit_entries(
        &self,
        session_token: &str,
        user_id: Option<&UserId>,
        limit: u64,
    ) -> Result<Vec<AuditLogEntry>, EngineError> {
        self.verify_admin(session_token).await?;
        let limit = limit.clamp(1, MAX_AUDIT_ENTRIES);
        let entries = match user_id {
            Some(id) => self.store.audit_log.list_for_user(id, limit).await?,
            None => self.store.audit_log.list_recent(limit).await?,
        };
        Ok(entries)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Membership administration
    // ════════════════════════════════════════════════════════════════════════════

    /// Changes end date and/or status of one membership and carries the
    /// change through to the card.
    ///
    /// # Errors
    ///
    /// - `Admin` with code `NO_CHANGES` when neither field is set; nothing
    ///   is written or audited
    /// - `Validation` for a blank reason or an end date before the start
    /// - `NotFound` for an unknown user or a membership of another user
    #[tracing::instrument(skip(self, session_token, command))]
    pub async fn adjust_membership(
        &self,
        session_token: &str,
        user_id: &UserId,
        membership_id: &MembershipId,
        command: AdjustMembership,
    ) -> Result<Membership, EngineError> {
        let admin = self.verify_admin(session_token).await?;
        if command.end_date.is_none() && command.status.is_none() {
            return Err(EngineError::no_changes());
        }
        let reason = required_reason(&command.reason)?;

        let user = self.load_user(user_id).await?;
        let mut membership = self
            .store
            .memberships
            .find_by_id(membership_id)
            .await?
            .filter(|m| m.user_id == user.id)
            .ok_or_else(|| EngineError::not_found("Membership", membership_id))?;

        let previous = (membership.end_date, membership.status);
        membership.adjust(command.end_date, command.status)?;
        self.store.memberships.update(&membership).await?;

        let card = self.propagate_to_card(&user, &membership).await?;

        let details = json!({
            "membership_id": membership.id,
            "reason": reason,
            "previous": { "end_date": previous.0, "status": previous.1 },
            "new": { "end_date": membership.end_date, "status": membership.status },
            "card_number": card.as_ref().map(|c| c.card().membership_number.to_string()),
        });
        self.audit(Some(user.id), AuditAction::MembershipAdjustment, &admin, details)
            .await?;

        tracing::info!(
            membership_id = %membership.id,
            status = %membership.status,
            end_date = %membership.end_date.date_string(),
            "Membership adjusted"
        );
        Ok(membership)
    }

    /// Soft-deletes every membership of a user.
    ///
    /// A live billing subscription blocks the delete unless the command
    /// asks for it to be canceled; in that case nothing is written. If a
    /// write fails after a cancellation went through, the partial deletion
    /// is still audited before the error is returned.
    #[tracing::instrument(skip(self, session_token, command))]
    pub async fn delete_member(
        &self,
        session_token: &str,
        user_id: &UserId,
        command: DeleteMember,
    ) -> Result<DeletionOutcome, EngineError> {
        let admin = self.verify_admin(session_token).await?;
        let reason = required_reason(&command.reason)?;
        let user = self.load_user(user_id).await?;
        let memberships = self.store.memberships.list_for_user(user_id).await?;

        let live = self.live_subscriptions(&user, &memberships).await?;
        if let (Some(first), false) = (live.first(), command.cancel_subscription) {
            return Err(EngineError::conflict(
                format!(
                    "Billing subscription {} is still active; cancel it before deleting the member",
                    first
                ),
                Some(first.clone()),
            ));
        }

        let mut canceled = Vec::with_capacity(live.len());
        let mut previous_statuses = Vec::new();
        let progress = self
            .cancel_and_soft_delete(&user, live, memberships, &mut canceled, &mut previous_statuses)
            .await;

        let mut details = json!({
            "reason": reason,
            "cancel_subscription": command.cancel_subscription,
            "canceled_subscriptions": canceled,
            "previous": previous_statuses,
        });

        if let Err(err) = progress {
            if canceled.is_empty() && previous_statuses.is_empty() {
                return Err(err);
            }
            // Cancellations cannot be rolled back; record what was done.
            details["completed"] = json!(false);
            details["error"] = json!(err.to_string());
            if let Err(audit_err) = self
                .audit(Some(user.id), AuditAction::MemberDeleted, &admin, details)
                .await
            {
                tracing::error!(
                    user_id = %user.id,
                    canceled_subscriptions = ?canceled,
                    error = %audit_err,
                    "Partial member deletion could not be audited"
                );
            }
            tracing::error!(user_id = %user.id, error = %err, "Member deletion stopped part way");
            return Err(err);
        }

        self.audit(Some(user.id), AuditAction::MemberDeleted, &admin, details)
            .await?;

        tracing::info!(user_id = %user.id, memberships = previous_statuses.len(), "Member deleted");
        Ok(DeletionOutcome {
            memberships_deleted: previous_statuses.len(),
            canceled_subscriptions: canceled,
        })
    }

    /// Cancels `live`, then soft-deletes the memberships and refreshes the
    /// card. Progress is pushed into `canceled` and `previous_statuses` as
    /// each write succeeds.
    async fn cancel_and_soft_delete(
        &self,
        user: &User,
        live: Vec<String>,
        memberships: Vec<Membership>,
        canceled: &mut Vec<String>,
        previous_statuses: &mut Vec<serde_json::Value>,
    ) -> Result<(), EngineError> {
        for subscription_id in live {
            self.gateway.cancel_subscription(&subscription_id).await?;
            tracing::info!(subscription_id = %subscription_id, "Subscription canceled for deletion");
            canceled.push(subscription_id);
        }

        let mut deleted = Vec::with_capacity(memberships.len());
        for mut membership in memberships {
            if membership.is_deleted() {
                deleted.push(membership);
                continue;
            }
            let previous = json!({ "membership_id": membership.id, "status": membership.status });
            membership.mark_deleted();
            self.store.memberships.update(&membership).await?;
            previous_statuses.push(previous);
            deleted.push(membership);
        }

        if let Some(latest) = deleted.iter().max_by_key(|m| m.end_date) {
            if let Some(card) = self.store.cards.find_by_user(&user.id).await? {
                self.cards
                    .update_card(
                        CardContext {
                            user,
                            membership: latest,
                        },
                        card,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Creates users, manual memberships and cards from legacy rows.
    ///
    /// Rows fail independently; the batch as a whole is audited once.
    #[tracing::instrument(skip(self, session_token, rows), fields(rows = rows.len()))]
    pub async fn bulk_import_members(
        &self,
        session_token: &str,
        rows: Vec<ImportRow>,
    ) -> Result<ImportSummary, EngineError> {
        let admin = self.verify_admin(session_token).await?;
        if rows.is_empty() {
            return Err(EngineError::validation("rows", "No rows to import"));
        }
        if rows.len() > self.settings.import_row_limit {
            return Err(EngineError::validation(
                "rows",
                format!(
                    "{} rows exceeds the import limit of {}",
                    rows.len(),
                    self.settings.import_row_limit
                ),
            ));
        }

        let today = Timestamp::now();
        let mut summary = ImportSummary::default();
        let mut created_emails = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            match self.import_row(row, today).await {
                Ok(user) => {
                    summary.created += 1;
                    created_emails.push(user.email);
                }
                Err(err) => {
                    tracing::warn!(row = index + 1, error = %err, "Import row rejected");
                    summary.errors.push(ImportRowError {
                        row: index + 1,
                        email: row.email.trim().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if summary.created > 0 {
            let details = json!({
                "created": summary.created,
                "failed": summary.errors.len(),
                "emails": created_emails,
                "errors": summary.errors,
            });
            self.audit(None, AuditAction::BulkImport, &admin, details).await?;
        }

        tracing::info!(created = summary.created, failed = summary.errors.len(), "Bulk import finished");
        Ok(summary)
    }

    async fn import_row(&self, row: &ImportRow, today: Timestamp) -> Result<User, EngineError> {
        let email = normalize_email(&row.email)?;
        let plan_type: PlanType = row.plan_type.parse()?;
        let status = match row.status.as_deref().map(str::trim) {
            None | Some("") => MembershipStatus::Legacy,
            Some(raw) => raw.parse()?,
        };
        let start_date = match row.start_date.as_deref().map(str::trim) {
            None | Some("") => today,
            Some(raw) => parse_date("start_date", raw)?,
        };
        let end_date = parse_date("end_date", row.end_date.trim())?;

        if self.store.users.find_by_email(&email).await?.is_some() {
            return Err(EngineError::conflict(
                format!("A user with email {} already exists", email),
                None,
            ));
        }

        let user = User::new(&email, row.name.as_str(), None)?;
        let membership = Membership::new(
            user.id,
            None,
            BillingTerms {
                plan_type,
                status,
                start_date,
                end_date,
                auto_renew: false,
            },
        )?;

        if self.store.users.insert(&user).await? == SaveResult::AlreadyExists {
            return Err(EngineError::conflict(
                format!("A user with email {} already exists", email),
                None,
            ));
        }
        self.store.memberships.insert(&membership).await?;
        if membership.status.grants_access() {
            self.cards
                .create_card(CardContext {
                    user: &user,
                    membership: &membership,
                })
                .await?;
        }
        Ok(user)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Billing
    // ════════════════════════════════════════════════════════════════════════════

    #[tracing::instrument(skip(self, session_token, command), fields(payment_id = %command.payment_id))]
    pub async fn issue_refund(
        &self,
        session_token: &str,
        command: IssueRefund,
    ) -> Result<Refund, EngineError> {
        let admin = self.verify_admin(session_token).await?;
        let payment_id = command.payment_id.trim();
        if payment_id.is_empty() {
            return Err(EngineError::validation("payment_id", "Payment id is required"));
        }
        if matches!(command.amount, Some(amount) if amount <= 0) {
            return Err(EngineError::validation("amount", "Refund amount must be positive"));
        }
        let reason = required_reason(&command.reason)?;

        let refund = self
            .gateway
            .issue_refund(RefundRequest {
                payment_id: payment_id.to_string(),
                amount: command.amount,
                reason: Some(reason.to_string()),
            })
            .await?;

        let details = json!({
            "refund_id": refund.id,
            "payment_id": refund.payment_id,
            "amount": refund.amount,
            "currency": refund.currency,
            "reason": reason,
        });
        self.audit(command.user_id, AuditAction::RefundIssued, &admin, details)
            .await?;

        tracing::info!(refund_id = %refund.id, amount = refund.amount, "Refund issued");
        Ok(refund)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reconciliation
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn validate_reconciliation(
        &self,
        session_token: &str,
        email: &str,
    ) -> Result<ReconciliationReport, EngineError> {
        self.verify_admin(session_token).await?;
        self.executor.validate(email).await
    }

    pub async fn execute_reconciliation(
        &self,
        session_token: &str,
        email: &str,
    ) -> Result<ReconciliationResult, EngineError> {
        let admin = self.verify_admin(session_token).await?;
        self.executor.reconcile(email, Some(&admin.id)).await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Helpers
    // ════════════════════════════════════════════════════════════════════════════

    async fn load_user(&self, user_id: &UserId) -> Result<User, EngineError> {
        self.store
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| EngineError::not_found("User", user_id))
    }

    /// Mirrors the user's current membership (or `changed` if none is
    /// current) onto the card. A card is only created for a status that
    /// grants access.
    async fn propagate_to_card(
        &self,
        user: &User,
        changed: &Membership,
    ) -> Result<Option<CardOutcome>, EngineError> {
        let memberships = self.store.memberships.list_for_user(&user.id).await?;
        let source = Membership::select_current(&memberships).unwrap_or(changed);
        let ctx = CardContext {
            user,
            membership: source,
        };

        match self.store.cards.find_by_user(&user.id).await? {
            Some(card) => Ok(Some(self.cards.update_card(ctx, card).await?)),
            None if source.status.grants_access() => Ok(Some(self.cards.create_card(ctx).await?)),
            None => Ok(None),
        }
    }

    /// Ids of billing subscriptions that still charge the member.
    async fn live_subscriptions(
        &self,
        user: &User,
        memberships: &[Membership],
    ) -> Result<Vec<String>, EngineError> {
        let mut live = Vec::new();

        if let Some(customer_id) = &user.billing_customer_id {
            for subscription in self.gateway.list_subscriptions(customer_id).await? {
                if subscription.status.is_live() {
                    live.push(subscription.id);
                }
            }
        }

        let mut unchecked: Vec<&String> = memberships
            .iter()
            .filter_map(|m| m.billing_subscription_id.as_ref())
            .filter(|id| !live.contains(id))
            .collect();
        unchecked.sort();
        unchecked.dedup();

        let lookups = unchecked
            .into_iter()
            .map(|id| self.gateway.get_subscription(id));
        for subscription in try_join_all(lookups).await?.into_iter().flatten() {
            if subscription.status.is_live() {
                live.push(subscription.id);
            }
        }

        Ok(live)
    }

    async fn audit(
        &self,
        subject: Option<UserId>,
        action: AuditAction,
        admin: &AdminPrincipal,
        details: serde_json::Value,
    ) -> Result<(), EngineError> {
        let entry = AuditLogEntry::new(subject, action, Some(admin.id.clone()), details);
        self.store.audit_log.append(&entry).await?;
        Ok(())
    }
}

fn required_reason(raw: &str) -> Result<&str, EngineError> {
    let reason = raw.trim();
    if reason.is_empty() {
        return Err(EngineError::validation("reason", "A reason is required"));
    }
    Ok(reason)
}

fn parse_date(field: &str, raw: &str) -> Result<Timestamp, EngineError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Timestamp::from_date)
        .map_err(|_| EngineError::validation(field, format!("'{}' is not a YYYY-MM-DD date", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::memory::{in_memory_record_store, InMemoryPaymentProvider};
    use crate::application::admin::admin_authorizer;
    use crate::application::card_lifecycle::CardSettings;
    use crate::application::reconciliation::SnapshotLoader;
    use async_trait::async_trait;

    use crate::domain::foundation::DomainError;
    use crate::ports::{
        Customer, MembershipRepository, PaymentError, Subscription, SubscriptionStatus,
    };

    const END: i64 = 1_767_139_200; // 2025-12-31
    const ADMIN: &str = "admin-token";
    const MEMBER: &str = "member-token";

    /// Reads and inserts go through; every update fails.
    struct UpdateFailingMemberships(Arc<dyn MembershipRepository>);

    #[async_trait]
    impl MembershipRepository for UpdateFailingMemberships {
        async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError> {
            self.0.find_by_id(id).await
        }
        async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError> {
            self.0.list_for_user(user_id).await
        }
        async fn find_by_subscription(
            &self,
            user_id: &UserId,
            subscription_id: &str,
        ) -> Result<Option<Membership>, DomainError> {
            self.0.find_by_subscription(user_id, subscription_id).await
        }
        async fn insert(&self, membership: &Membership) -> Result<SaveResult, DomainError> {
            self.0.insert(membership).await
        }
        async fn update(&self, _: &Membership) -> Result<(), DomainError> {
            Err(DomainError::database("connection reset"))
        }
    }

    struct Harness {
        service: AdminMembershipService,
        store: RecordStore,
        provider: Arc<InMemoryPaymentProvider>,
    }

    fn harness_with(settings: AdminSettings) -> Harness {
        harness_over(in_memory_record_store(), settings)
    }

    fn harness_over(store: RecordStore, settings: AdminSettings) -> Harness {
        let provider = Arc::new(InMemoryPaymentProvider::new());
        let cards = Arc::new(MembershipCardLifecycle::new(
            store.cards.clone(),
            store.counters.clone(),
            CardSettings {
                number_prefix: "MEM-".into(),
                number_width: 6,
                signing_secret: SecretString::new("card-key".into()),
            },
        ));
        let executor = Arc::new(ReconciliationExecutor::new(
            SnapshotLoader::new(provider.clone(), store.clone()),
            store.clone(),
            cards.clone(),
        ));
        let sessions = Arc::new(
            MockSessionValidator::new()
                .with_admin(ADMIN, "admin@club.example")
                .with_member(MEMBER, "member@club.example"),
        );
        let service = AdminMembershipService::new(
            admin_authorizer(sessions, None),
            store.clone(),
            provider.clone(),
            executor,
            cards,
            settings,
        );
        Harness {
            service,
            store,
            provider,
        }
    }

    fn harness() -> Harness {
        harness_with(AdminSettings::default())
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    /// A billing-linked active member with membership and card.
    async fn seed_member(h: &Harness, live_subscription: bool) -> (User, Membership) {
        let user = User::new("ada@example.com", "Ada Lovelace", Some("cus_1".into())).unwrap();
        h.store.users.insert(&user).await.unwrap();
        let membership = Membership::new(
            user.id,
            Some("sub_1".into()),
            BillingTerms {
                plan_type: PlanType::Individual,
                status: MembershipStatus::Active,
                start_date: ts(END - 365 * 86_400),
                end_date: ts(END),
                auto_renew: true,
            },
        )
        .unwrap();
        h.store.memberships.insert(&membership).await.unwrap();
        h.service
            .cards
            .create_card(CardContext {
                user: &user,
                membership: &membership,
            })
            .await
            .unwrap();

        h.provider.add_customer(Customer {
            id: "cus_1".into(),
            email: Some("ada@example.com".into()),
            name: Some("Ada Lovelace".into()),
            created_at: 1,
        });
        h.provider.put_subscription(Subscription {
            id: "sub_1".into(),
            customer_id: "cus_1".into(),
            status: if live_subscription {
                SubscriptionStatus::Active
            } else {
                SubscriptionStatus::Canceled
            },
            plan_type: Some(PlanType::Individual),
            current_period_start: END - 365 * 86_400,
            current_period_end: END,
            cancel_at_period_end: false,
            created_at: 1,
        });
        (user, membership)
    }

    async fn audit_count(h: &Harness) -> usize {
        h.store.audit_log.list_recent(1000).await.unwrap().len()
    }

    fn row(email: &str, plan: &str, end: &str) -> ImportRow {
        ImportRow {
            email: email.into(),
            name: String::new(),
            plan_type: plan.into(),
            status: None,
            start_date: Some("2024-01-01".into()),
            end_date: end.into(),
        }
    }

    #[tokio::test]
    async fn every_operation_rejects_non_admins() {
        let h = harness();
        let id = UserId::new();

        let err = h.service.search_members(MEMBER, "", 1, 10).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        let err = h.service.get_member("nope", &id).await.unwrap_err();
        assert_eq!(err.code(), "SESSION_ERROR");
        let err = h
            .service
            .bulk_import_members(MEMBER, vec![row("a@b.example", "family", "2026-01-01")])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        assert!(h.store.users.find_by_email("a@b.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn adjustment_without_fields_is_no_changes_and_not_audited() {
        let h = harness();
        let (user, membership) = seed_member(&h, true).await;
        let before = audit_count(&h).await;

        let err = h
            .service
            .adjust_membership(
                ADMIN,
                &user.id,
                &membership.id,
                AdjustMembership {
                    end_date: None,
                    status: None,
                    reason: "typo".into(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), "NO_CHANGES");
        assert_eq!(audit_count(&h).await, before);
    }

    #[tokio::test]
    async fn adjustment_updates_membership_card_and_audit() {
        let h = harness();
        let (user, membership) = seed_member(&h, true).await;
        let new_end = ts(END + 30 * 86_400);

        let updated = h
            .service
            .adjust_membership(
                ADMIN,
                &user.id,
                &membership.id,
                AdjustMembership {
                    end_date: Some(new_end),
                    status: Some(MembershipStatus::Complimentary),
                    reason: "Volunteer of the year".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.end_date, new_end);
        assert_eq!(updated.status, MembershipStatus::Complimentary);

        let card = h.store.cards.find_by_user(&user.id).await.unwrap().unwrap();
        assert_eq!(card.valid_until, new_end);
        assert_eq!(card.status, MembershipStatus::Complimentary);

        let entries = h.store.audit_log.list_for_user(&user.id, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::MembershipAdjustment);
        assert_eq!(entries[0].details["reason"], "Volunteer of the year");
        assert_eq!(entries[0].details["previous"]["status"], "active");
        assert_eq!(entries[0].actor_id.as_deref(), Some("admin|admin@club.example"));
    }

    #[tokio::test]
    async fn adjustment_requires_reason_and_valid_window() {
        let h = harness();
        let (user, membership) = seed_member(&h, true).await;

        let err = h
            .service
            .adjust_membership(
                ADMIN,
                &user.id,
                &membership.id,
                AdjustMembership {
                    end_date: Some(ts(END)),
                    status: None,
                    reason: "  ".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = h
            .service
            .adjust_membership(
                ADMIN,
                &user.id,
                &membership.id,
                AdjustMembership {
                    end_date: Some(ts(END - 400 * 86_400)),
                    status: None,
                    reason: "rollback".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = h
            .service
            .adjust_membership(
                ADMIN,
                &user.id,
                &MembershipId::new(),
                AdjustMembership {
                    end_date: Some(ts(END)),
                    status: None,
                    reason: "x".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(audit_count(&h).await, 0);
    }

    #[tokio::test]
    async fn delete_with_live_subscription_conflicts_without_writes() {
        let h = harness();
        let (user, membership) = seed_member(&h, true).await;

        let err = h
            .service
            .delete_member(
                ADMIN,
                &user.id,
                DeleteMember {
                    reason: "moved away".into(),
                    cancel_subscription: false,
                },
            )
            .await
            .unwrap_err();

        match err {
            EngineError::Conflict {
                subscription_id,
                message,
            } => {
                assert_eq!(subscription_id.as_deref(), Some("sub_1"));
                assert!(message.contains("sub_1"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        let stored = h.store.memberships.find_by_id(&membership.id).await.unwrap().unwrap();
        assert_eq!(stored, membership);
        assert!(!h.provider.was_called("cancel_subscription"));
        assert_eq!(audit_count(&h).await, 0);
    }

    #[tokio::test]
    async fn delete_with_cancel_cancels_then_soft_deletes() {
        let h = harness();
        let (user, membership) = seed_member(&h, true).await;

        let outcome = h
            .service
            .delete_member(
                ADMIN,
                &user.id,
                DeleteMember {
                    reason: "moved away".into(),
                    cancel_subscription: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.memberships_deleted, 1);
        assert_eq!(outcome.canceled_subscriptions, vec!["sub_1".to_string()]);
        assert!(h.provider.was_called("cancel_subscription"));

        let stored = h.store.memberships.find_by_id(&membership.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MembershipStatus::Deleted);
        assert!(!stored.auto_renew);

        let card = h.store.cards.find_by_user(&user.id).await.unwrap().unwrap();
        assert_eq!(card.status, MembershipStatus::Deleted);
        assert!(h.store.users.find_by_id(&user.id).await.unwrap().is_some());

        let entries = h.store.audit_log.list_for_user(&user.id, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::MemberDeleted);
    }

    #[tokio::test]
    async fn delete_without_live_subscription_needs_no_cancel() {
        let h = harness();
        let (user, _) = seed_member(&h, false).await;

        let outcome = h
            .service
            .delete_member(
                ADMIN,
                &user.id,
                DeleteMember {
                    reason: "lapsed".into(),
                    cancel_subscription: false,
                },
            )
            .await
            .unwrap();

        assert!(outcome.canceled_subscriptions.is_empty());
        assert!(!h.provider.was_called("cancel_subscription"));
    }

    #[tokio::test]
    async fn delete_stops_when_provider_is_down() {
        let h = harness();
        let (user, membership) = seed_member(&h, true).await;
        h.provider
            .fail_method("list_subscriptions", PaymentError::network("timeout"));

        let err = h
            .service
            .delete_member(
                ADMIN,
                &user.id,
                DeleteMember {
                    reason: "x".into(),
                    cancel_subscription: true,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), "PROVIDER_UNAVAILABLE");
        let stored = h.store.memberships.find_by_id(&membership.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MembershipStatus::Active);
    }

    #[tokio::test]
    async fn failed_soft_delete_after_cancellation_is_still_audited() {
        let mut store = in_memory_record_store();
        store.memberships = Arc::new(UpdateFailingMemberships(store.memberships.clone()));
        let h = harness_over(store, AdminSettings::default());
        let (user, membership) = seed_member(&h, true).await;

        let err = h
            .service
            .delete_member(
                ADMIN,
                &user.id,
                DeleteMember {
                    reason: "moved away".into(),
                    cancel_subscription: true,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), "STORAGE_ERROR");
        assert!(h.provider.was_called("cancel_subscription"));
        let stored = h.store.memberships.find_by_id(&membership.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MembershipStatus::Active);

        let audit = h.store.audit_log.list_recent(10).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::MemberDeleted);
        assert_eq!(audit[0].details["canceled_subscriptions"], json!(["sub_1"]));
        assert_eq!(audit[0].details["completed"], json!(false));
        assert!(audit[0].details["previous"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bulk_import_reports_row_errors_and_audits_once() {
        let h = harness();
        seed_member(&h, true).await;

        let rows = vec![
            row("new.one@example.com", "individual", "2026-06-30"),
            row("not-an-email", "individual", "2026-06-30"),
            row("ada@example.com", "family", "2026-06-30"),
            row("new.two@example.com", "couple", "2026-06-30"),
            row("new.three@example.com", "family", "31/12/2026"),
            row("new.one@example.com", "family", "2026-06-30"),
            row("new.four@example.com", "family", "2023-01-01"),
        ];
        let summary = h.service.bulk_import_members(ADMIN, rows).await.unwrap();

        assert_eq!(summary.created, 1);
        let failed: Vec<usize> = summary.errors.iter().map(|e| e.row).collect();
        assert_eq!(failed, vec![2, 3, 4, 5, 6, 7]);

        let user = h
            .store
            .users
            .find_by_email("new.one@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(user.billing_customer_id.is_none());
        let memberships = h.store.memberships.list_for_user(&user.id).await.unwrap();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].status, MembershipStatus::Legacy);
        assert!(memberships[0].billing_subscription_id.is_none());
        assert!(h.store.cards.find_by_user(&user.id).await.unwrap().is_some());

        let entries = h.store.audit_log.list_recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::BulkImport);
        assert_eq!(entries[0].details["created"], 1);
    }

    #[tokio::test]
    async fn bulk_import_enforces_row_limit() {
        let h = harness_with(AdminSettings {
            import_row_limit: 2,
        });
        let rows = vec![
            row("a@example.com", "family", "2026-01-01"),
            row("b@example.com", "family", "2026-01-01"),
            row("c@example.com", "family", "2026-01-01"),
        ];

        let err = h.service.bulk_import_members(ADMIN, rows).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(h.store.users.find_by_email("a@example.com").await.unwrap().is_none());
        assert_eq!(audit_count(&h).await, 0);
    }

    #[tokio::test]
    async fn search_validates_paging_and_attaches_memberships() {
        let h = harness();
        seed_member(&h, true).await;

        assert_eq!(
            h.service.search_members(ADMIN, "", 0, 10).await.unwrap_err().code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            h.service.search_members(ADMIN, "", 1, 101).await.unwrap_err().code(),
            "VALIDATION_ERROR"
        );

        let page = h.service.search_members(ADMIN, "lovelace", 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].user.email, "ada@example.com");
        assert!(page.items[0].membership.is_some());
    }

    #[tokio::test]
    async fn refund_is_issued_and_audited() {
        let h = harness();
        let (user, _) = seed_member(&h, true).await;

        let refund = h
            .service
            .issue_refund(
                ADMIN,
                IssueRefund {
                    payment_id: "pi_1".into(),
                    amount: Some(500),
                    reason: "double charge".into(),
                    user_id: Some(user.id),
                },
            )
            .await
            .unwrap();

        assert_eq!(refund.payment_id, "pi_1");
        assert_eq!(h.provider.refunds().len(), 1);
        let entries = h.store.audit_log.list_for_user(&user.id, 10).await.unwrap();
        assert_eq!(entries[0].action, AuditAction::RefundIssued);
        assert_eq!(entries[0].details["reason"], "double charge");
    }

    #[tokio::test]
    async fn refund_rejects_bad_input_before_calling_provider() {
        let h = harness();
        let err = h
            .service
            .issue_refund(
                ADMIN,
                IssueRefund {
                    payment_id: "pi_1".into(),
                    amount: Some(0),
                    reason: "x".into(),
                    user_id: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(!h.provider.was_called("issue_refund"));
    }

    #[tokio::test]
    async fn execute_reconciliation_records_admin_as_actor() {
        let h = harness();
        let (user, _) = seed_member(&h, true).await;
        h.provider
            .set_subscription_status("sub_1", SubscriptionStatus::PastDue);

        let report = h.service.validate_reconciliation(ADMIN, "ada@example.com").await.unwrap();
        assert!(report.can_reconcile);

        let result = h.service.execute_reconciliation(ADMIN, "ada@example.com").await.unwrap();
        assert!(result.success);

        let entries = h
            .service
            .list_audit_entries(ADMIN, Some(&user.id), 0)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Reconciliation);
        assert_eq!(entries[0].actor_id.as_deref(), Some("admin|admin@club.example"));
    }
}
