//! Admin HTTP endpoints.

mod dto;
mod handlers;
mod routes;

pub use routes::admin_routes;
