//! Mock session validator for testing.
//!
//! ```ignore
//! let validator = MockSessionValidator::new()
//!     .with_admin("admin-token", "admin@club.example");
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Stores a map of tokens to users. Unknown tokens return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation while set.
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token that maps to a user.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a token carrying the admin claim.
    pub fn with_admin(self, token: impl Into<String>, email: &str) -> Self {
        let user = AuthenticatedUser::new(
            format!("admin|{}", email),
            email,
            Some("Test Admin".to_string()),
            true,
        );
        self.with_user(token, user)
    }

    /// Adds a token for a signed-in member without admin rights.
    pub fn with_member(self, token: impl Into<String>, email: &str) -> Self {
        let user = AuthenticatedUser::new(format!("member|{}", email), email, None, false);
        self.with_user(token, user)
    }

    pub fn with_error(self, error: AuthError) -> Self {
        *self
            .force_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), user);
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_tokens_validate() {
        let validator = MockSessionValidator::new().with_admin("t1", "admin@club.example");
        let user = validator.validate("t1").await.unwrap();
        assert!(user.is_admin);
        assert_eq!(user.email, "admin@club.example");
        assert_eq!(validator.validate("nope").await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn forced_error_wins() {
        let validator = MockSessionValidator::new()
            .with_admin("t1", "admin@club.example")
            .with_error(AuthError::TokenExpired);
        assert_eq!(validator.validate("t1").await, Err(AuthError::TokenExpired));
    }
}
