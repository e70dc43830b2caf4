//! Payment provider port.
//!
//! Read access to billing customers and subscriptions, plus the two writes
//! the engine is allowed to make upstream: cancelling a subscription and
//! issuing a refund.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::membership::{EngineError, MembershipStatus, PlanType};

/// Port for the billing provider (Stripe in production).
#[async_trait]
pub trait PaymentProviderGateway: Send + Sync {
    /// Find a customer by email. Returns the most recently created match.
    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError>;

    /// Get customer by provider ID.
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError>;

    /// All subscriptions of a customer, in any status.
    async fn list_subscriptions(&self, customer_id: &str)
        -> Result<Vec<Subscription>, PaymentError>;

    /// Get subscription by provider ID.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError>;

    /// Cancel a subscription immediately.
    async fn cancel_subscription(&self, subscription_id: &str)
        -> Result<Subscription, PaymentError>;

    /// Refund a payment, fully or partially.
    async fn issue_refund(&self, request: RefundRequest) -> Result<Refund, PaymentError>;
}

/// Customer in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer ID.
    pub id: String,

    pub email: Option<String>,

    pub name: Option<String>,

    /// Unix timestamp.
    pub created_at: i64,
}

/// Subscription in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Provider's subscription ID.
    pub id: String,

    /// Provider's customer ID.
    pub customer_id: String,

    pub status: SubscriptionStatus,

    /// `None` when the subscription's price is not one of the configured plans.
    pub plan_type: Option<PlanType>,

    /// Current billing period start (Unix timestamp).
    pub current_period_start: i64,

    /// Current billing period end (Unix timestamp).
    pub current_period_end: i64,

    pub cancel_at_period_end: bool,

    /// Unix timestamp.
    pub created_at: i64,
}

impl Subscription {
    pub fn period_start(&self) -> Option<Timestamp> {
        Timestamp::from_unix_secs(self.current_period_start)
    }

    pub fn period_end(&self) -> Option<Timestamp> {
        Timestamp::from_unix_secs(self.current_period_end)
    }
}

/// Subscription status from payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Trialing,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    /// Billing is still live: the member is or may be charged.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::PastDue
        )
    }

    /// The subscription can never become active again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Canceled | SubscriptionStatus::IncompleteExpired
        )
    }

    /// Membership status a subscription in this state maps to.
    ///
    /// Paused subscriptions collect no payment, so they count as unpaid.
    pub fn to_membership_status(&self) -> MembershipStatus {
        match self {
            SubscriptionStatus::Active => MembershipStatus::Active,
            SubscriptionStatus::PastDue => MembershipStatus::PastDue,
            SubscriptionStatus::Canceled => MembershipStatus::Canceled,
            SubscriptionStatus::Trialing => MembershipStatus::Trialing,
            SubscriptionStatus::Incomplete => MembershipStatus::Incomplete,
            SubscriptionStatus::IncompleteExpired => MembershipStatus::IncompleteExpired,
            SubscriptionStatus::Unpaid | SubscriptionStatus::Paused => MembershipStatus::Unpaid,
        }
    }

    /// Parses the provider's wire value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "trialing" => Some(SubscriptionStatus::Trialing),
            "incomplete" => Some(SubscriptionStatus::Incomplete),
            "incomplete_expired" => Some(SubscriptionStatus::IncompleteExpired),
            "unpaid" => Some(SubscriptionStatus::Unpaid),
            "paused" => Some(SubscriptionStatus::Paused),
            _ => None,
        }
    }
}

/// Refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Payment intent or charge ID.
    pub payment_id: String,

    /// Amount in the smallest currency unit; `None` refunds in full.
    pub amount: Option<i64>,

    pub reason: Option<String>,
}

/// Refund issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,

    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for EngineError {
    fn from(err: PaymentError) -> Self {
        match err.code {
            PaymentErrorCode::NotFound => EngineError::not_found("Billing resource", err.message),
            PaymentErrorCode::InvalidRequest => EngineError::validation("payment", err.message),
            _ if err.retryable => EngineError::ProviderUnavailable(err.to_string()),
            _ => EngineError::Provider(err.to_string()),
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    NotFound,
    InvalidRequest,
    RateLimitExceeded,
    ProviderError,
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
