//! Shared wiring for the integration tests: the full engine over the
//! in-memory store and a scriptable billing provider.

#![allow(dead_code)]

use std::sync::Arc;

use secrecy::SecretString;

use club_membership::adapters::auth::MockSessionValidator;
use club_membership::adapters::memory::{in_memory_record_store, InMemoryPaymentProvider};
use club_membership::application::admin::{admin_authorizer, AdminMembershipService, AdminSettings};
use club_membership::application::card_lifecycle::{CardSettings, MembershipCardLifecycle};
use club_membership::application::reconciliation::{ReconciliationExecutor, SnapshotLoader};
use club_membership::application::webhook::{WebhookIdempotencyGuard, WebhookProcessor};
use club_membership::domain::foundation::Timestamp;
use club_membership::domain::membership::PlanType;
use club_membership::ports::{Customer, RecordStore, Subscription, SubscriptionStatus};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const ADMIN_EMAIL: &str = "admin@club.example";
pub const MEMBER_TOKEN: &str = "member-token";

pub const EMAIL: &str = "ada@example.com";
pub const CUSTOMER_ID: &str = "cus_ada";
pub const SUBSCRIPTION_ID: &str = "sub_ada";

/// 2025-01-01T00:00:00Z
pub const PERIOD_START: i64 = 1_735_689_600;
/// 2025-12-31T00:00:00Z
pub const PERIOD_END: i64 = 1_767_139_200;

pub struct Engine {
    pub store: RecordStore,
    pub provider: Arc<InMemoryPaymentProvider>,
    pub cards: Arc<MembershipCardLifecycle>,
    pub executor: Arc<ReconciliationExecutor>,
    pub guard: Arc<WebhookIdempotencyGuard>,
    pub webhooks: Arc<WebhookProcessor>,
    pub admin: Arc<AdminMembershipService>,
}

impl Engine {
    pub fn new() -> Self {
        let store = in_memory_record_store();
        let provider = Arc::new(InMemoryPaymentProvider::new());
        let cards = Arc::new(MembershipCardLifecycle::new(
            store.cards.clone(),
            store.counters.clone(),
            CardSettings {
                number_prefix: "MEM-".into(),
                number_width: 6,
                signing_secret: SecretString::new("integration-card-key".into()),
            },
        ));
        let executor = Arc::new(ReconciliationExecutor::new(
            SnapshotLoader::new(provider.clone(), store.clone()),
            store.clone(),
            cards.clone(),
        ));
        let guard = Arc::new(WebhookIdempotencyGuard::new(store.webhook_events.clone()));
        let webhooks = Arc::new(WebhookProcessor::new(
            guard.clone(),
            provider.clone(),
            executor.clone(),
        ));
        let sessions = Arc::new(
            MockSessionValidator::new()
                .with_admin(ADMIN_TOKEN, ADMIN_EMAIL)
                .with_member(MEMBER_TOKEN, "member@club.example"),
        );
        let admin = Arc::new(AdminMembershipService::new(
            admin_authorizer(sessions, None),
            store.clone(),
            provider.clone(),
            executor.clone(),
            cards.clone(),
            AdminSettings::default(),
        ));

        Self {
            store,
            provider,
            cards,
            executor,
            guard,
            webhooks,
            admin,
        }
    }

    /// Registers Ada as a provider customer with one subscription.
    pub fn bill_ada(&self, status: SubscriptionStatus, plan: PlanType, period_end: i64) {
        self.provider.add_customer(Customer {
            id: CUSTOMER_ID.into(),
            email: Some(EMAIL.into()),
            name: Some("Ada Lovelace".into()),
            created_at: PERIOD_START,
        });
        self.provider.put_subscription(Subscription {
            id: SUBSCRIPTION_ID.into(),
            customer_id: CUSTOMER_ID.into(),
            status,
            plan_type: Some(plan),
            current_period_start: PERIOD_START,
            current_period_end: period_end,
            cancel_at_period_end: false,
            created_at: PERIOD_START,
        });
    }

    pub async fn audit_count(&self) -> usize {
        self.store.audit_log.list_recent(1_000).await.unwrap().len()
    }
}

pub fn ts(secs: i64) -> Timestamp {
    Timestamp::from_unix_secs(secs).unwrap()
}
