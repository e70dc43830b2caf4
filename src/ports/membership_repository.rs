//! Membership repository port.
//!
//! Memberships are keyed naturally by (user, billing subscription id). The
//! insert is conditional on that key so replayed reconciliations never
//! append duplicate rows.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MembershipId, UserId};
use crate::domain::membership::Membership;

use super::SaveResult;

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError>;

    /// Every membership of a user, newest end date first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError>;

    async fn find_by_subscription(
        &self,
        user_id: &UserId,
        subscription_id: &str,
    ) -> Result<Option<Membership>, DomainError>;

    /// Insert unless a row with the same (user, subscription id) exists.
    ///
    /// Manual memberships (no subscription id) always insert.
    async fn insert(&self, membership: &Membership) -> Result<SaveResult, DomainError>;

    /// Update plan type, status, dates and auto-renew by id.
    ///
    /// # Errors
    ///
    /// - `MembershipNotFound` if no row has this id
    async fn update(&self, membership: &Membership) -> Result<(), DomainError>;
}
