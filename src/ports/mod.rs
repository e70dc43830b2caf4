//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the engine and the outside world. Adapters implement these ports.
//!
//! ## Store Ports
//!
//! - `UserRepository`, `MembershipRepository`, `CardRepository`
//! - `CounterStore` - atomic membership-number allocation
//! - `AuditLogRepository` - append-only audit trail
//! - `WebhookEventRepository` - webhook idempotency ledger
//! - `RecordStore` - all of the above bundled
//!
//! ## External Ports
//!
//! - `PaymentProviderGateway` - billing provider
//! - `SessionValidator` - access token validation

mod audit_log_repository;
mod card_repository;
mod counter_store;
mod membership_repository;
mod payment_provider;
mod record_store;
mod session_validator;
mod user_repository;
mod webhook_event_repository;

pub use audit_log_repository::AuditLogRepository;
pub use card_repository::CardRepository;
pub use counter_store::{CounterStore, MEMBERSHIP_NUMBER_COUNTER};
pub use membership_repository::MembershipRepository;
pub use payment_provider::{
    Customer, PaymentError, PaymentErrorCode, PaymentProviderGateway, Refund, RefundRequest,
    Subscription, SubscriptionStatus,
};
pub use record_store::RecordStore;
pub use session_validator::SessionValidator;
pub use user_repository::{UserPage, UserRepository};
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookOutcome,
};
