//! Stripe REST response bodies.
//!
//! Only the fields the gateway reads are modelled; everything else in
//! Stripe's payloads is ignored.

use serde::Deserialize;

/// Any `{"object": "list", "data": [...]}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    /// Older API versions carry the period on the subscription; newer ones
    /// only on its items.
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub items: Option<StripeList<StripeSubscriptionItem>>,
}

impl StripeSubscription {
    fn first_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.as_ref().and_then(|items| items.data.first())
    }

    pub fn price_id(&self) -> Option<&str> {
        self.first_item().map(|item| item.price.id.as_str())
    }

    pub fn period(&self) -> Option<(i64, i64)> {
        let item = self.first_item();
        let start = self
            .current_period_start
            .or_else(|| item.and_then(|i| i.current_period_start))?;
        let end = self
            .current_period_end
            .or_else(|| item.and_then(|i| i.current_period_end))?;
        Some((start, end))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: StripePrice,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeRefund {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub charge: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// `{"error": {...}}` body returned with 4xx/5xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
