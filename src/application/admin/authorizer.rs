//! Admin authorization.
//!
//! One `Authorizer` capability backed by two composable checks: the session
//! must carry the admin claim, and, when an allow-list is configured, the
//! session email must be on it.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::membership::EngineError;
use crate::ports::SessionValidator;

/// A verified administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminPrincipal {
    pub id: String,
    pub email: String,
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Resolves a session token to an administrator or fails.
    ///
    /// # Errors
    ///
    /// - `Session` for missing, expired or invalid tokens
    /// - `Unauthorized` for valid sessions without admin rights
    async fn authorize(&self, session_token: &str) -> Result<AdminPrincipal, EngineError>;
}

/// Accepts sessions that carry the admin claim.
pub struct SessionClaimAuthorizer {
    sessions: Arc<dyn SessionValidator>,
}

impl SessionClaimAuthorizer {
    pub fn new(sessions: Arc<dyn SessionValidator>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Authorizer for SessionClaimAuthorizer {
    async fn authorize(&self, session_token: &str) -> Result<AdminPrincipal, EngineError> {
        if session_token.trim().is_empty() {
            return Err(EngineError::Session("Missing session token".to_string()));
        }
        let user = self.sessions.validate(session_token).await?;
        if !user.is_admin {
            tracing::warn!(subject = %user.subject, "Non-admin session rejected");
            return Err(EngineError::unauthorized("Admin privileges required"));
        }
        Ok(AdminPrincipal {
            id: user.subject,
            email: user.email.to_lowercase(),
        })
    }
}

/// Narrows another authorizer to an explicit set of admin emails.
pub struct AllowListAuthorizer {
    inner: Arc<dyn Authorizer>,
    allowed: HashSet<String>,
}

impl AllowListAuthorizer {
    pub fn new(inner: Arc<dyn Authorizer>, emails: impl IntoIterator<Item = String>) -> Self {
        let allowed = emails
            .into_iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { inner, allowed }
    }
}

#[async_trait]
impl Authorizer for AllowListAuthorizer {
    async fn authorize(&self, session_token: &str) -> Result<AdminPrincipal, EngineError> {
        let principal = self.inner.authorize(session_token).await?;
        if !self.allowed.contains(&principal.email) {
            tracing::warn!(email = %principal.email, "Admin not on allow-list");
            return Err(EngineError::unauthorized("Admin is not on the allow-list"));
        }
        Ok(principal)
    }
}

/// Claim check, wrapped in the allow-list when one is configured.
pub fn admin_authorizer(
    sessions: Arc<dyn SessionValidator>,
    allow_list: Option<Vec<String>>,
) -> Arc<dyn Authorizer> {
    let claim: Arc<dyn Authorizer> = Arc::new(SessionClaimAuthorizer::new(sessions));
    match allow_list {
        Some(emails) if !emails.is_empty() => Arc::new(AllowListAuthorizer::new(claim, emails)),
        _ => claim,
    }
}
