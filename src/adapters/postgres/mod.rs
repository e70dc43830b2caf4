//! PostgreSQL adapters for the store ports.
//!
//! Runtime-checked `sqlx` queries against the schema in `migrations/`.
//! Conditional inserts use `ON CONFLICT DO NOTHING` and report
//! `SaveResult::AlreadyExists` when no row was written.

mod audit_log;
mod cards;
mod counters;
mod memberships;
mod users;
mod webhook_events;

use std::sync::Arc;

use sqlx::PgPool;

pub use audit_log::PostgresAuditLogRepository;
pub use cards::PostgresCardRepository;
pub use counters::PostgresCounterStore;
pub use memberships::PostgresMembershipRepository;
pub use users::PostgresUserRepository;
pub use webhook_events::PostgresWebhookEventRepository;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::RecordStore;

/// A `RecordStore` backed by one connection pool.
pub fn postgres_record_store(pool: PgPool) -> RecordStore {
    RecordStore {
        users: Arc::new(PostgresUserRepository::new(pool.clone())),
        memberships: Arc::new(PostgresMembershipRepository::new(pool.clone())),
        cards: Arc::new(PostgresCardRepository::new(pool.clone())),
        counters: Arc::new(PostgresCounterStore::new(pool.clone())),
        audit_log: Arc::new(PostgresAuditLogRepository::new(pool.clone())),
        webhook_events: Arc::new(PostgresWebhookEventRepository::new(pool)),
    }
}

/// Applies the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Migrations completed");
    Ok(())
}

fn query_failed(action: &str, err: sqlx::Error) -> DomainError {
    tracing::error!(error = %err, "Failed to {}", action);
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, err))
}

/// A stored value that no longer parses into its domain type.
fn corrupt_column(column: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid value in column {}: {}", column, err),
    )
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
