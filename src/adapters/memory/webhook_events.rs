//! In-memory webhook-event ledger.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookOutcome};

#[derive(Default)]
pub struct InMemoryWebhookEventRepository {
    records: RwLock<HashMap<String, WebhookEventRecord>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.records.read().await.get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.event_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        records.insert(record.event_id.clone(), record);
        Ok(SaveResult::Inserted)
    }

    async fn mark_outcome(
        &self,
        event_id: &str,
        outcome: WebhookOutcome,
        error_message: Option<String>,
    ) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(event_id).ok_or_else(|| {
            DomainError::new(ErrorCode::NotFound, "Webhook event not found")
                .with_detail("id", event_id)
        })?;
        record.outcome = outcome;
        record.error_message = error_message;
        record.processed_at = Timestamp::now();
        Ok(())
    }

    async fn delete(&self, event_id: &str) -> Result<bool, DomainError> {
        Ok(self.records.write().await.remove(event_id).is_some())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !r.processed_at.is_before(&cutoff));
        Ok((before - records.len()) as u64)
    }
}
