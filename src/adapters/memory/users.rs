//! In-memory user repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::membership::User;
use crate::ports::{SaveResult, UserPage, UserRepository};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<SaveResult, DomainError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || users.values().any(|u| u.email == user.email) {
            return Ok(SaveResult::AlreadyExists);
        }
        users.insert(user.id, user.clone());
        Ok(SaveResult::Inserted)
    }

    async fn update(&self, user: &User) -> Result<(), DomainError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                existing.display_name = user.display_name.clone();
                existing.billing_customer_id = user.billing_customer_id.clone();
                Ok(())
            }
            None => Err(DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("id", user.id.to_string())),
        }
    }

    async fn search(&self, query: &str, offset: u64, limit: u64) -> Result<UserPage, DomainError> {
        let needle = query.trim().to_lowercase();
        let users = self.users.read().await;
        let mut matches: Vec<&User> = users
            .values()
            .filter(|u| {
                needle.is_empty()
                    || u.email.contains(&needle)
                    || u.display_name.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.email.cmp(&b.email)));

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(UserPage { items, total })
    }
}
