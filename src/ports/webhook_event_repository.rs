//! WebhookEventRepository port - the idempotency ledger for provider webhooks.
//!
//! The ledger is the single source of truth for exactly-once processing.
//! An event id is inserted once; retried deliveries hit the primary key and
//! are reported as `AlreadyExists`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{DomainError, Timestamp};

/// Processing state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Admitted, processing not yet finished.
    Processing,
    Success,
    Ignored,
    Failed,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Processing => "processing",
            WebhookOutcome::Success => "success",
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "processing" => Some(WebhookOutcome::Processing),
            "success" => Some(WebhookOutcome::Success),
            "ignored" => Some(WebhookOutcome::Ignored),
            "failed" => Some(WebhookOutcome::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for WebhookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger entry for one provider event.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEventRecord {
    /// Provider event ID (evt_xxx format).
    pub event_id: String,

    /// Provider event type (e.g., "customer.subscription.updated").
    pub event_type: String,

    pub processed_at: Timestamp,

    pub outcome: WebhookOutcome,

    /// Failure or ignore reason.
    pub error_message: Option<String>,

    /// Original event payload for debugging.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    /// A freshly admitted event.
    pub fn processing(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            outcome: WebhookOutcome::Processing,
            error_message: None,
            payload,
        }
    }
}

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted.
    Inserted,
    /// A record with the same natural key already exists; nothing written.
    AlreadyExists,
}

/// Port for the webhook-event ledger.
///
/// Implementations must rely on a uniqueness constraint on `event_id` so
/// that concurrent deliveries of one event admit exactly one of them.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a ledger entry by event ID.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Insert the record unless the event ID is already present.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Record the processing outcome of an admitted event.
    async fn mark_outcome(
        &self,
        event_id: &str,
        outcome: WebhookOutcome,
        error_message: Option<String>,
    ) -> Result<(), DomainError>;

    /// Remove one entry so a later delivery of the same event is admitted
    /// again. Returns false if there was nothing to remove.
    async fn delete(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Delete entries processed before `cutoff`. Returns the number deleted.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
