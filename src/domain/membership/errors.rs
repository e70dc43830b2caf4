//! Engine error taxonomy.
//!
//! Every exposed operation fails with one of these kinds. Pure detection and
//! planning never fail; only I/O and operator input do.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Unauthorized | 401 |
//! | Session | 401 |
//! | NotFound | 404 |
//! | Validation | 400 |
//! | Provider | 502 |
//! | ProviderUnavailable | 503 |
//! | Storage | 500 |
//! | Conflict | 409 |
//! | Admin | 422 |
//! | ReconciliationAborted | 500 |

use thiserror::Error;

use crate::domain::foundation::{AuthError, DomainError, ErrorCode, ValidationError};
use crate::domain::reconciliation::{ReconciliationResult, ReconciliationStep};

/// Admin error code for an adjustment that names no field to change.
pub const NO_CHANGES: &str = "NO_CHANGES";

/// Errors surfaced by the reconciliation and administration engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Missing or insufficient admin rights.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session token expired or invalid.
    #[error("Session error: {0}")]
    Session(String),

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Upstream billing failure.
    #[error("Billing provider error: {0}")]
    Provider(String),

    /// Billing provider temporarily unreachable or rate limiting.
    #[error("Billing provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The operation is blocked by current state, e.g. a live subscription.
    #[error("{message}")]
    Conflict {
        message: String,
        subscription_id: Option<String>,
    },

    /// Operator-caused failure with its own machine code.
    #[error("{message}")]
    Admin { code: String, message: String },

    /// A reconciliation write failed; steps before `step` stay committed.
    #[error("Reconciliation aborted during {step}: {source}")]
    ReconciliationAborted {
        step: ReconciliationStep,
        source: Box<EngineError>,
        partial: Box<ReconciliationResult>,
    },
}

impl EngineError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        EngineError::Unauthorized(message.into())
    }

    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        EngineError::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        EngineError::Provider(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        EngineError::Storage(message.into())
    }

    pub fn conflict(message: impl Into<String>, subscription_id: Option<String>) -> Self {
        EngineError::Conflict {
            message: message.into(),
            subscription_id,
        }
    }

    pub fn admin(code: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Admin {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn no_changes() -> Self {
        Self::admin(NO_CHANGES, "No changes specified: provide an end date and/or a status")
    }

    /// True when the same call may succeed later without any change on our
    /// side: an unreachable provider or a storage failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::ProviderUnavailable(_) | EngineError::Storage(_) => true,
            EngineError::ReconciliationAborted { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Machine-readable error kind.
    pub fn code(&self) -> &str {
        match self {
            EngineError::Unauthorized(_) => "UNAUTHORIZED",
            EngineError::Session(_) => "SESSION_ERROR",
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::Validation { .. } => "VALIDATION_ERROR",
            EngineError::Provider(_) => "PROVIDER_ERROR",
            EngineError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            EngineError::Storage(_) => "STORAGE_ERROR",
            EngineError::Conflict { .. } => "CONFLICT",
            EngineError::Admin { code, .. } => code,
            EngineError::ReconciliationAborted { .. } => "RECONCILIATION_ABORTED",
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for EngineError {
    fn from(err: DomainError) -> Self {
        if err.code.is_not_found() {
            let resource = match err.code {
                ErrorCode::UserNotFound => "User",
                ErrorCode::MembershipNotFound => "Membership",
                ErrorCode::CardNotFound => "Membership card",
                _ => "Resource",
            };
            let id = err
                .details
                .get("id")
                .cloned()
                .unwrap_or_else(|| err.message.clone());
            return EngineError::NotFound {
                resource: resource.to_string(),
                id,
            };
        }

        match err.code {
            ErrorCode::ValidationFailed => EngineError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::AlreadyExists => EngineError::conflict(err.message, None),
            ErrorCode::ExternalServiceError => EngineError::Provider(err.message),
            _ => EngineError::Storage(err.to_string()),
        }
    }
}

impl From<AuthError> for EngineError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions => EngineError::Unauthorized(err.to_string()),
            other => EngineError::Session(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_changes_uses_admin_code() {
        let err = EngineError::no_changes();
        assert_eq!(err.code(), "NO_CHANGES");
    }

    #[test]
    fn not_found_domain_errors_keep_resource_and_id() {
        let err: EngineError = DomainError::new(ErrorCode::UserNotFound, "User not found")
            .with_detail("id", "abc")
            .into();
        match err {
            EngineError::NotFound { resource, id } => {
                assert_eq!(resource, "User");
                assert_eq!(id, "abc");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn database_errors_become_storage_errors() {
        let err: EngineError = DomainError::database("connection reset").into();
        assert_eq!(err.code(), "STORAGE_ERROR");
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(EngineError::storage("connection reset").is_retryable());
        assert!(EngineError::ProviderUnavailable("timeout".into()).is_retryable());
        assert!(!EngineError::provider("unmapped price").is_retryable());
        assert!(!EngineError::not_found("User", "u1").is_retryable());

        let aborted = EngineError::ReconciliationAborted {
            step: ReconciliationStep::SyncCard,
            source: Box::new(EngineError::storage("disk")),
            partial: Box::new(ReconciliationResult::default()),
        };
        assert!(aborted.is_retryable());
    }

    #[test]
    fn validation_errors_keep_field() {
        let err: EngineError = ValidationError::empty_field("reason").into();
        assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "reason"));
    }

    #[test]
    fn auth_errors_split_session_and_permission() {
        assert_eq!(EngineError::from(AuthError::TokenExpired).code(), "SESSION_ERROR");
        assert_eq!(
            EngineError::from(AuthError::InsufficientPermissions).code(),
            "UNAUTHORIZED"
        );
    }
}
