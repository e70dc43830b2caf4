//! Membership card repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::membership::{MembershipCard, MembershipNumber};

use super::SaveResult;

/// Repository port for membership cards. One live card per user.
#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<MembershipCard>, DomainError>;

    async fn find_by_number(
        &self,
        number: &MembershipNumber,
    ) -> Result<Option<MembershipCard>, DomainError>;

    /// Insert unless the user already has a card.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the membership number is taken by another user
    async fn insert(&self, card: &MembershipCard) -> Result<SaveResult, DomainError>;

    /// Rewrite derived fields by card id. The membership number is never
    /// part of the update.
    ///
    /// # Errors
    ///
    /// - `CardNotFound` if no row has this id
    async fn update(&self, card: &MembershipCard) -> Result<(), DomainError>;
}
