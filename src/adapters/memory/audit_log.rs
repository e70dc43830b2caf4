//! In-memory audit log.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::membership::AuditLogEntry;
use crate::ports::AuditLogRepository;

#[derive(Default)]
pub struct InMemoryAuditLogRepository {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry in append order.
    pub async fn all(&self) -> Vec<AuditLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), DomainError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u64,
    ) -> Result<Vec<AuditLogEntry>, DomainError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| e.subject_user_id.as_ref() == Some(user_id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<AuditLogEntry>, DomainError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
