//! Adapters - implementations of the port traits.
//!
//! - `auth` - session validation (JWT, mock)
//! - `http` - axum API surface
//! - `memory` - in-process store and billing provider for tests and local runs
//! - `postgres` - sqlx-backed record store
//! - `stripe` - Stripe REST gateway

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
