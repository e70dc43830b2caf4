//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, auth)
//! - `membership` - Users, memberships, cards, audit trail, engine errors
//! - `reconciliation` - Discrepancy detection and corrective planning
//! - `webhook` - Billing provider event envelope and signature verification

pub mod foundation;
pub mod membership;
pub mod reconciliation;
pub mod webhook;
