//! Application layer - use cases over the ports.
//!
//! Reconciliation, card lifecycle, webhook processing and the admin
//! surface. Nothing here knows about HTTP, SQL or Stripe's wire format.

pub mod admin;
pub mod card_lifecycle;
pub mod reconciliation;
pub mod webhook;
