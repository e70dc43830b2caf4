//! Stripe implementation of `PaymentProviderGateway`.
//!
//! Plain REST over `reqwest` with the secret key as basic-auth user.
//! Subscription prices are mapped to club plan types through configuration;
//! a price that is not configured yields `plan_type: None`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::membership::PlanType;
use crate::ports::{
    Customer, PaymentError, PaymentErrorCode, PaymentProviderGateway, Refund, RefundRequest,
    Subscription, SubscriptionStatus,
};

use super::wire::{StripeCustomer, StripeErrorBody, StripeList, StripeRefund, StripeSubscription};

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    api_base_url: String,

    /// Price id -> plan type.
    price_plans: HashMap<String, PlanType>,

    timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE.to_string(),
            price_plans: HashMap::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_price(mut self, price_id: impl Into<String>, plan: PlanType) -> Self {
        self.price_plans.insert(price_id.into(), plan);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn plan_for_price(&self, price_id: &str) -> Option<PlanType> {
        self.price_plans.get(price_id).copied()
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("price_plans", &self.price_plans)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct StripePaymentGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentGateway {
    /// # Errors
    ///
    /// Fails only if the TLS backend cannot be initialised.
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::provider(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<T, PaymentError> {
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = map_error(status, &body);
            if err.code != PaymentErrorCode::NotFound {
                tracing::error!(operation, status = %status, error = %err, "Stripe request failed");
            }
            return Err(err);
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe {} response: {}", operation, e))
        })
    }

    fn to_subscription(&self, sub: StripeSubscription) -> Result<Subscription, PaymentError> {
        to_subscription(&self.config, sub)
    }
}

#[async_trait]
impl PaymentProviderGateway for StripePaymentGateway {
    #[tracing::instrument(skip(self))]
    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError> {
        let request = self
            .http_client
            .get(self.url("customers"))
            .query(&[("email", email), ("limit", "10")]);
        let list: StripeList<StripeCustomer> = self.send(request, "customer search").await?;

        Ok(list
            .data
            .into_iter()
            .filter(|c| !c.deleted)
            .max_by_key(|c| c.created)
            .map(to_customer))
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        let request = self.http_client.get(self.url(&format!("customers/{}", customer_id)));
        match self.send::<StripeCustomer>(request, "customer").await {
            Ok(customer) if customer.deleted => Ok(None),
            Ok(customer) => Ok(Some(to_customer(customer))),
            Err(err) if err.code == PaymentErrorCode::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, PaymentError> {
        let request = self.http_client.get(self.url("subscriptions")).query(&[
            ("customer", customer_id),
            ("status", "all"),
            ("limit", "100"),
        ]);
        let list: StripeList<StripeSubscription> =
            self.send(request, "subscription list").await?;
        if list.has_more {
            tracing::warn!(customer_id, "Customer has more than 100 subscriptions; oldest ignored");
        }

        let mut subscriptions = Vec::with_capacity(list.data.len());
        for sub in list.data {
            match self.to_subscription(sub) {
                Ok(sub) => subscriptions.push(sub),
                Err(err) => tracing::warn!(error = %err, "Skipping unreadable subscription"),
            }
        }
        Ok(subscriptions)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        let request = self
            .http_client
            .get(self.url(&format!("subscriptions/{}", subscription_id)));
        match self.send::<StripeSubscription>(request, "subscription").await {
            Ok(sub) => self.to_subscription(sub).map(Some),
            Err(err) if err.code == PaymentErrorCode::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, PaymentError> {
        let request = self
            .http_client
            .delete(self.url(&format!("subscriptions/{}", subscription_id)));
        let sub: StripeSubscription = self.send(request, "subscription cancel").await?;
        tracing::info!(subscription_id, status = %sub.status, "Stripe subscription canceled");
        self.to_subscription(sub)
    }

    #[tracing::instrument(skip(self, request), fields(payment_id = %request.payment_id))]
    async fn issue_refund(&self, request: RefundRequest) -> Result<Refund, PaymentError> {
        let target = if request.payment_id.starts_with("ch_") {
            "charge"
        } else {
            "payment_intent"
        };
        let mut params = vec![(target.to_string(), request.payment_id.clone())];
        if let Some(amount) = request.amount {
            params.push(("amount".to_string(), amount.to_string()));
        }
        if let Some(reason) = &request.reason {
            params.push(("metadata[reason]".to_string(), reason.clone()));
        }

        let http = self.http_client.post(self.url("refunds")).form(&params);
        let refund: StripeRefund = self.send(http, "refund").await?;

        Ok(Refund {
            payment_id: refund
                .payment_intent
                .or(refund.charge)
                .unwrap_or(request.payment_id),
            id: refund.id,
            amount: refund.amount,
            currency: refund.currency,
            status: refund.status,
        })
    }
}

fn to_customer(customer: StripeCustomer) -> Customer {
    Customer {
        id: customer.id,
        email: customer.email,
        name: customer.name,
        created_at: customer.created,
    }
}

fn to_subscription(
    config: &StripeConfig,
    sub: StripeSubscription,
) -> Result<Subscription, PaymentError> {
    let status = SubscriptionStatus::parse(&sub.status).ok_or_else(|| {
        PaymentError::provider(format!(
            "Subscription {} has unrecognised status '{}'",
            sub.id, sub.status
        ))
    })?;
    let (current_period_start, current_period_end) = sub.period().ok_or_else(|| {
        PaymentError::provider(format!("Subscription {} has no billing period", sub.id))
    })?;

    let plan_type = sub.price_id().and_then(|price| {
        let plan = config.plan_for_price(price);
        if plan.is_none() {
            tracing::warn!(subscription_id = %sub.id, price_id = price, "Unmapped Stripe price");
        }
        plan
    });

    Ok(Subscription {
        id: sub.id,
        customer_id: sub.customer,
        status,
        plan_type,
        current_period_start,
        current_period_end,
        cancel_at_period_end: sub.cancel_at_period_end,
        created_at: sub.created,
    })
}

fn map_error(status: StatusCode, body: &str) -> PaymentError {
    let api_error = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let message = api_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("Stripe API returned {}", status));

    let code = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PaymentErrorCode::AuthenticationError,
        StatusCode::NOT_FOUND => PaymentErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
        StatusCode::BAD_REQUEST | StatusCode::PAYMENT_REQUIRED => PaymentErrorCode::InvalidRequest,
        s if s.is_server_error() => PaymentErrorCode::NetworkError,
        _ => PaymentErrorCode::ProviderError,
    };

    let err = PaymentError::new(code, message);
    match api_error.and_then(|e| e.code.or(e.error_type)) {
        Some(provider_code) => err.with_provider_code(provider_code),
        None => err,
    }
}
