//! Club Membership - reconciliation and administration engine
//!
//! Keeps the club's membership records, membership cards and audit trail in
//! agreement with the billing provider, and exposes the admin operations
//! that repair or adjust them.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
