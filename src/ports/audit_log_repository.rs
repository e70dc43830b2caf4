//! Audit log port. Append-only: no update or delete operations exist.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::membership::AuditLogEntry;

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), DomainError>;

    /// Entries about one user, newest first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u64,
    ) -> Result<Vec<AuditLogEntry>, DomainError>;

    /// Most recent entries of any subject, newest first.
    async fn list_recent(&self, limit: u64) -> Result<Vec<AuditLogEntry>, DomainError>;
}
