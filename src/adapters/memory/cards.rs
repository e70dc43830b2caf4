//! In-memory membership card repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{CardId, DomainError, ErrorCode, UserId};
use crate::domain::membership::{MembershipCard, MembershipNumber};
use crate::ports::{CardRepository, SaveResult};

#[derive(Default)]
pub struct InMemoryCardRepository {
    cards: RwLock<HashMap<CardId, MembershipCard>>,
}

impl InMemoryCardRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardRepository for InMemoryCardRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<MembershipCard>, DomainError> {
        Ok(self
            .cards
            .read()
            .await
            .values()
            .find(|c| c.user_id == *user_id)
            .cloned())
    }

    async fn find_by_number(
        &self,
        number: &MembershipNumber,
    ) -> Result<Option<MembershipCard>, DomainError> {
        Ok(self
            .cards
            .read()
            .await
            .values()
            .find(|c| c.membership_number == *number)
            .cloned())
    }

    async fn insert(&self, card: &MembershipCard) -> Result<SaveResult, DomainError> {
        let mut cards = self.cards.write().await;
        if cards.values().any(|c| c.user_id == card.user_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        if cards
            .values()
            .any(|c| c.membership_number == card.membership_number)
        {
            return Err(DomainError::new(
                ErrorCode::AlreadyExists,
                format!("Membership number {} is already assigned", card.membership_number),
            ));
        }
        cards.insert(card.id, card.clone());
        Ok(SaveResult::Inserted)
    }

    async fn update(&self, card: &MembershipCard) -> Result<(), DomainError> {
        let mut cards = self.cards.write().await;
        match cards.get_mut(&card.id) {
            Some(existing) => {
                let number = existing.membership_number.clone();
                *existing = card.clone();
                existing.membership_number = number;
                Ok(())
            }
            None => Err(DomainError::new(ErrorCode::CardNotFound, "Membership card not found")
                .with_detail("id", card.id.to_string())),
        }
    }
}
