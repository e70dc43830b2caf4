//! HTTP adapter - the axum surface over the application services.

pub mod admin;
pub mod cards;
pub mod error;
pub mod middleware;
pub mod router;
pub mod state;
pub mod webhooks;

pub use error::{ApiError, ErrorResponse};
pub use router::app_router;
pub use state::AppState;
