//! Session validation adapters.
//!
//! - `JwtSessionValidator` - HS256 tokens from the club identity service
//! - `MockSessionValidator` - token map for tests

mod jwt;
mod mock;

pub use jwt::{Audience, JwtSessionValidator, SessionClaims};
pub use mock::MockSessionValidator;
