//! Stripe billing adapter.
//!
//! Implements `PaymentProviderGateway` against the Stripe REST API. Webhook
//! signature verification lives with the domain webhook types.

mod gateway;
mod wire;

pub use gateway::{StripeConfig, StripePaymentGateway};
