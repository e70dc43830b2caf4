//! The persistent store as one bundle of repository ports.

use std::sync::Arc;

use super::{
    AuditLogRepository, CardRepository, CounterStore, MembershipRepository, UserRepository,
    WebhookEventRepository,
};

/// Handles to every store-side port.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct RecordStore {
    pub users: Arc<dyn UserRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub cards: Arc<dyn CardRepository>,
    pub counters: Arc<dyn CounterStore>,
    pub audit_log: Arc<dyn AuditLogRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
}
