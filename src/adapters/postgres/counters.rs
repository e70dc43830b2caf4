//! PostgreSQL implementation of CounterStore.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::ports::CounterStore;

use super::query_failed;

/// Single-statement upsert; the row lock serialises concurrent callers.
pub struct PostgresCounterStore {
    pool: PgPool,
}

impl PostgresCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PostgresCounterStore {
    async fn increment(&self, name: &str) -> Result<i64, DomainError> {
        sqlx::query_scalar(
            r#"
            INSERT INTO counters (name, value) VALUES ($1, 1)
            ON CONFLICT (name) DO UPDATE SET value = counters.value + 1
            RETURNING value
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| query_failed("increment counter", e))
    }
}
