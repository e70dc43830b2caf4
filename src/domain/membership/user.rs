//! Club member identity record.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId, ValidationError};

/// Normalizes an email for storage and lookup.
///
/// Emails are unique case-insensitively, so every lookup and insert goes
/// through this function.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::empty_field("email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(ValidationError::invalid_format(
            "email",
            format!("'{}' is not an email address", raw.trim()),
        )),
    }
}

/// A club member.
///
/// Users are never physically deleted; removal is expressed through the
/// status of their memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Billing provider customer id, `None` until linked.
    pub billing_customer_id: Option<String>,

    /// Normalized (lower-case) email.
    pub email: String,

    pub display_name: String,

    pub created_at: Timestamp,
}

impl User {
    /// Creates a user with a normalized email.
    pub fn new(
        email: &str,
        display_name: impl Into<String>,
        billing_customer_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let email = normalize_email(email)?;
        let display_name = display_name.into().trim().to_string();
        let display_name = if display_name.is_empty() {
            email.clone()
        } else {
            display_name
        };

        Ok(Self {
            id: UserId::new(),
            billing_customer_id,
            email,
            display_name,
            created_at: Timestamp::now(),
        })
    }
}
