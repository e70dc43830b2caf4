//! Authentication types for the domain layer.
//!
//! These types represent an authenticated session extracted from a token.
//! Any session provider can populate them via the `SessionValidator` port.

use thiserror::Error;

/// Identity carried by a validated session token.
///
/// `subject` is the identity provider's subject claim, not a club member id:
/// administrators do not need a membership record of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Subject claim from the session token.
    pub subject: String,

    /// Email address from the token claims.
    pub email: String,

    /// Display name if the token carries one.
    pub display_name: Option<String>,

    /// Whether the token carries the admin claim.
    pub is_admin: bool,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(
        subject: impl Into<String>,
        email: impl Into<String>,
        display_name: Option<String>,
        is_admin: bool,
    ) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
            display_name,
            is_admin,
        }
    }
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired (separate from InvalidToken for specific handling).
    #[error("Token expired")]
    TokenExpired,

    /// The session is valid but lacks the required privileges.
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// The authentication service is unavailable (network, config, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the caller should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}
