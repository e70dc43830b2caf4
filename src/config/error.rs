//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Invalid Stripe webhook secret format")]
    InvalidStripeWebhookSecret,

    #[error("Stripe API base URL must use HTTPS in production")]
    ApiBaseMustBeHttps,

    #[error("Price id {0} is mapped to more than one plan")]
    DuplicatePriceId(String),

    #[error("Session secret must be at least 32 bytes")]
    SessionSecretTooShort,

    #[error("Invalid admin email in allow-list: {0}")]
    InvalidAdminEmail(String),

    #[error("Card number prefix must be uppercase letters, digits or '-'")]
    InvalidCardPrefix,

    #[error("Card number width must be between 4 and 12")]
    InvalidCardNumberWidth,

    #[error("Webhook retention must be at least one day")]
    InvalidRetention,

    #[error("Import row limit must be between 1 and 10000")]
    InvalidImportLimit,
}
