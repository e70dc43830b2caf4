//! In-memory membership repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, MembershipId, Timestamp, UserId};
use crate::domain::membership::Membership;
use crate::ports::{MembershipRepository, SaveResult};

#[derive(Default)]
pub struct InMemoryMembershipRepository {
    memberships: RwLock<HashMap<MembershipId, Membership>>,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError> {
        Ok(self.memberships.read().await.get(id).cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError> {
        let mut list: Vec<Membership> = self
            .memberships
            .read()
            .await
            .values()
            .filter(|m| m.user_id == *user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.end_date.cmp(&a.end_date));
        Ok(list)
    }

    async fn find_by_subscription(
        &self,
        user_id: &UserId,
        subscription_id: &str,
    ) -> Result<Option<Membership>, DomainError> {
        Ok(self
            .memberships
            .read()
            .await
            .values()
            .find(|m| {
                m.user_id == *user_id
                    && m.billing_subscription_id.as_deref() == Some(subscription_id)
            })
            .cloned())
    }

    async fn insert(&self, membership: &Membership) -> Result<SaveResult, DomainError> {
        let mut memberships = self.memberships.write().await;
        let duplicate = memberships.contains_key(&membership.id)
            || membership.billing_subscription_id.as_ref().is_some_and(|sub| {
                memberships.values().any(|m| {
                    m.user_id == membership.user_id
                        && m.billing_subscription_id.as_ref() == Some(sub)
                })
            });
        if duplicate {
            return Ok(SaveResult::AlreadyExists);
        }
        memberships.insert(membership.id, membership.clone());
        Ok(SaveResult::Inserted)
    }

    async fn update(&self, membership: &Membership) -> Result<(), DomainError> {
        let mut memberships = self.memberships.write().await;
        match memberships.get_mut(&membership.id) {
            Some(existing) => {
                existing.plan_type = membership.plan_type;
                existing.status = membership.status;
                existing.start_date = membership.start_date;
                existing.end_date = membership.end_date;
                existing.auto_renew = membership.auto_renew;
                existing.updated_at = Timestamp::now();
                Ok(())
            }
            None => Err(
                DomainError::new(ErrorCode::MembershipNotFound, "Membership not found")
                    .with_detail("id", membership.id.to_string()),
            ),
        }
    }
}
