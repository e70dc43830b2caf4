//! Webhook error types.

use thiserror::Error;

/// Errors that occur while accepting a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid signature")]
    InvalidSignature,

    /// Older than the five-minute window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// In the future beyond clock-skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Ledger or processing failure; the provider should redeliver.
    #[error("Processing error: {0}")]
    Processing(String),
}

impl WebhookError {
    /// True if the provider should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Processing(_))
    }
}
