//! Webhook application services: admission and processing.

mod guard;
mod processor;

pub use guard::{Admission, WebhookIdempotencyGuard};
pub use processor::{WebhookProcessor, WebhookReceipt};
