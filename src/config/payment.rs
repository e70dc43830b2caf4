//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::adapters::stripe::StripeConfig;
use crate::domain::membership::PlanType;

use super::error::ValidationError;
use super::server::Environment;

/// Stripe credentials and the price ids that identify each plan.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub stripe_api_key: SecretString,

    /// Webhook endpoint signing secret
    pub stripe_webhook_secret: SecretString,

    /// Price id billed for individual memberships
    pub individual_price_id: String,

    /// Price id billed for family memberships
    pub family_price_id: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Outbound request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Gateway settings with both plans mapped.
    pub fn stripe_config(&self) -> StripeConfig {
        StripeConfig::new(self.stripe_api_key.clone())
            .with_base_url(self.api_base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_price(self.individual_price_id.clone(), PlanType::Individual)
            .with_price(self.family_price_id.clone(), PlanType::Family)
    }

    /// Validate payment configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"));
        }
        if !api_key.starts_with("sk_") && !api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if self.individual_price_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__INDIVIDUAL_PRICE_ID"));
        }
        if self.family_price_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__FAMILY_PRICE_ID"));
        }
        if self.individual_price_id == self.family_price_id {
            return Err(ValidationError::DuplicatePriceId(
                self.family_price_id.clone(),
            ));
        }

        if *environment == Environment::Production && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::ApiBaseMustBeHttps);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_timeout() -> u64 {
    10
}
