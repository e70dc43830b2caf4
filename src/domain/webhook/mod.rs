//! Webhook module - billing provider event envelope and signature checks.

mod errors;
mod stripe_event;
mod verifier;

pub use errors::WebhookError;
pub use stripe_event::{StripeEvent, StripeEventData, StripeEventType};
pub use verifier::{sign_payload, SignatureHeader, StripeWebhookVerifier};
