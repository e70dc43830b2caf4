//! WebhookIdempotencyGuard - exactly-once admission of provider events.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookOutcome};

/// Admission decision for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// False when the event id is already in the ledger; the caller must
    /// acknowledge without reprocessing.
    pub admitted: bool,
}

pub struct WebhookIdempotencyGuard {
    ledger: Arc<dyn WebhookEventRepository>,
}

impl WebhookIdempotencyGuard {
    pub fn new(ledger: Arc<dyn WebhookEventRepository>) -> Self {
        Self { ledger }
    }

    /// Conditionally inserts the event id. Only the first delivery is admitted.
    pub async fn admit(
        &self,
        event_id: &str,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<Admission, DomainError> {
        let record = WebhookEventRecord::processing(event_id, event_type, payload);
        let admitted = self.ledger.save(record).await? == SaveResult::Inserted;
        if !admitted {
            tracing::info!(event_id = %event_id, "Duplicate webhook delivery skipped");
        }
        Ok(Admission { admitted })
    }

    /// Records how an admitted event ended. The entry stays in the ledger
    /// whatever the outcome.
    pub async fn complete(
        &self,
        event_id: &str,
        outcome: WebhookOutcome,
        error_message: Option<String>,
    ) -> Result<(), DomainError> {
        self.ledger.mark_outcome(event_id, outcome, error_message).await
    }

    /// Forgets an admitted event after a transient failure, so the
    /// provider's redelivery is admitted and processed.
    pub async fn release(&self, event_id: &str) -> Result<(), DomainError> {
        if self.ledger.delete(event_id).await? {
            tracing::warn!(event_id = %event_id, "Webhook released for redelivery");
        }
        Ok(())
    }

    /// Drops ledger entries processed before `cutoff`.
    pub async fn purge_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let deleted = self.ledger.delete_before(cutoff).await?;
        tracing::info!(deleted, cutoff = %cutoff, "Purged webhook ledger");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryWebhookEventRepository;
    use serde_json::json;

    #[tokio::test]
    async fn replayed_event_is_admitted_once() {
        let guard = WebhookIdempotencyGuard::new(Arc::new(InMemoryWebhookEventRepository::new()));

        let first = guard.admit("evt_1", "invoice.paid", json!({})).await.unwrap();
        let second = guard.admit("evt_1", "invoice.paid", json!({})).await.unwrap();

        assert!(first.admitted);
        assert!(!second.admitted);
    }

    #[tokio::test]
    async fn failed_events_stay_in_ledger() {
        let ledger = Arc::new(InMemoryWebhookEventRepository::new());
        let guard = WebhookIdempotencyGuard::new(ledger.clone());

        guard.admit("evt_1", "invoice.paid", json!({})).await.unwrap();
        guard
            .complete("evt_1", WebhookOutcome::Failed, Some("boom".into()))
            .await
            .unwrap();

        let record = ledger.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(record.outcome, WebhookOutcome::Failed);
        assert!(!guard.admit("evt_1", "invoice.paid", json!({})).await.unwrap().admitted);
    }

    #[tokio::test]
    async fn released_event_is_admitted_again() {
        let guard = WebhookIdempotencyGuard::new(Arc::new(InMemoryWebhookEventRepository::new()));
        guard.admit("evt_1", "invoice.paid", json!({})).await.unwrap();

        guard.release("evt_1").await.unwrap();
        guard.release("evt_1").await.unwrap();

        assert!(guard.admit("evt_1", "invoice.paid", json!({})).await.unwrap().admitted);
    }

    #[tokio::test]
    async fn purge_removes_only_old_entries() {
        let guard = WebhookIdempotencyGuard::new(Arc::new(InMemoryWebhookEventRepository::new()));
        guard.admit("evt_1", "invoice.paid", json!({})).await.unwrap();

        assert_eq!(guard.purge_before(Timestamp::now().add_days(-30)).await.unwrap(), 0);
        assert_eq!(guard.purge_before(Timestamp::now().add_days(1)).await.unwrap(), 1);
        assert!(guard.admit("evt_1", "invoice.paid", json!({})).await.unwrap().admitted);
    }
}
