//! PostgreSQL implementation of AuditLogRepository. Append-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{AuditEntryId, DomainError, Timestamp, UserId};
use crate::domain::membership::AuditLogEntry;
use crate::ports::AuditLogRepository;

use super::{corrupt_column, query_failed, to_i64};

pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    subject_user_id: Option<Uuid>,
    action: String,
    actor_id: Option<String>,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditLogEntry {
            id: AuditEntryId::from_uuid(row.id),
            subject_user_id: row.subject_user_id.map(UserId::from_uuid),
            action: row.action.parse().map_err(|e| corrupt_column("action", e))?,
            actor_id: row.actor_id,
            details: row.details,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const COLUMNS: &str = "id, subject_user_id, action, actor_id, details, created_at";

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, subject_user_id, action, actor_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.subject_user_id.as_ref().map(|id| *id.as_uuid()))
        .bind(entry.action.as_str())
        .bind(&entry.actor_id)
        .bind(&entry.details)
        .bind(entry.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("append audit entry", e))?;
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u64,
    ) -> Result<Vec<AuditLogEntry>, DomainError> {
        let rows: Vec<AuditRow> = sqlx::query_as(&format!(
            "SELECT {} FROM audit_log WHERE subject_user_id = $1 ORDER BY created_at DESC LIMIT $2",
            COLUMNS
        ))
        .bind(user_id.as_uuid())
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list audit entries", e))?;
        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<AuditLogEntry>, DomainError> {
        let rows: Vec<AuditRow> = sqlx::query_as(&format!(
            "SELECT {} FROM audit_log ORDER BY created_at DESC LIMIT $1",
            COLUMNS
        ))
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list audit entries", e))?;
        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}
