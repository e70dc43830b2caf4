//! In-memory adapters for every store port and the billing provider.
//!
//! Used by tests and local runs without Postgres or Stripe.

mod audit_log;
mod cards;
mod counters;
mod memberships;
mod payment_provider;
mod users;
mod webhook_events;

use std::sync::Arc;

pub use audit_log::InMemoryAuditLogRepository;
pub use cards::InMemoryCardRepository;
pub use counters::InMemoryCounterStore;
pub use memberships::InMemoryMembershipRepository;
pub use payment_provider::InMemoryPaymentProvider;
pub use users::InMemoryUserRepository;
pub use webhook_events::InMemoryWebhookEventRepository;

use crate::ports::RecordStore;

/// A `RecordStore` backed entirely by memory.
pub fn in_memory_record_store() -> RecordStore {
    RecordStore {
        users: Arc::new(InMemoryUserRepository::new()),
        memberships: Arc::new(InMemoryMembershipRepository::new()),
        cards: Arc::new(InMemoryCardRepository::new()),
        counters: Arc::new(InMemoryCounterStore::new()),
        audit_log: Arc::new(InMemoryAuditLogRepository::new()),
        webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
    }
}
