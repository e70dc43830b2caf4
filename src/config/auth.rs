//! Session and admin access configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

const MIN_SECRET_LEN: usize = 32;

/// HS256 session token settings and the optional admin allow-list.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 signing secret of the identity service
    pub session_secret: SecretString,

    /// Expected `iss` claim
    pub issuer: String,

    /// Expected `aud` claim
    pub audience: String,

    /// Comma-separated admin emails; unset or empty admits every admin session
    pub admin_emails: Option<String>,
}

impl AuthConfig {
    /// Allow-list entries, lowercased. `None` when no list is configured.
    pub fn admin_allow_list(&self) -> Option<Vec<String>> {
        let emails: Vec<String> = self
            .admin_emails
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty())
            .collect();
        if emails.is_empty() {
            None
        } else {
            Some(emails)
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.session_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__SESSION_SECRET"));
        }
        if self.session_secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(ValidationError::SessionSecretTooShort);
        }
        if self.issuer.trim().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__ISSUER"));
        }
        if self.audience.trim().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__AUDIENCE"));
        }
        for email in self.admin_allow_list().unwrap_or_default() {
            let well_formed = email
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                .unwrap_or(false);
            if !well_formed {
                return Err(ValidationError::InvalidAdminEmail(email));
            }
        }
        Ok(())
    }
}
