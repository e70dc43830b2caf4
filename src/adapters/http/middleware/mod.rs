//! Request extractors shared by the route groups.

mod bearer;

pub use bearer::BearerToken;
