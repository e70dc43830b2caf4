//! User repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::membership::User;

use super::SaveResult;

/// One page of users matching a search.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPage {
    pub items: Vec<User>,
    pub total: u64,
}

/// Repository port for users.
///
/// Emails are stored normalized; callers pass normalized emails.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Insert unless a user with the same email exists.
    async fn insert(&self, user: &User) -> Result<SaveResult, DomainError>;

    /// Update name and billing customer id by user id.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if no row has this id
    async fn update(&self, user: &User) -> Result<(), DomainError>;

    /// Case-insensitive substring search over email and display name,
    /// ordered by creation time (newest first).
    async fn search(&self, query: &str, offset: u64, limit: u64) -> Result<UserPage, DomainError>;
}
