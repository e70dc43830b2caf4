//! Stripe webhook event envelope.
//!
//! Only the fields the engine routes on are captured; the data object is
//! kept as raw JSON and searched for the customer reference.

use serde::{Deserialize, Serialize};

/// Stripe webhook event (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp.
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

/// Event types that trigger a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    CustomerSubscriptionCreated,
    CustomerSubscriptionUpdated,
    CustomerSubscriptionDeleted,
    CustomerSubscriptionPaused,
    CustomerSubscriptionResumed,
    InvoicePaid,
    InvoicePaymentFailed,
    Unknown,
}

impl StripeEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::CustomerSubscriptionCreated,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "customer.subscription.paused" => Self::CustomerSubscriptionPaused,
            "customer.subscription.resumed" => Self::CustomerSubscriptionResumed,
            "invoice.paid" | "invoice.payment_succeeded" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    /// True for events that can change membership state.
    pub fn affects_membership(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl StripeEvent {
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }

    /// Customer ID referenced by the data object, expanded or not.
    pub fn customer_id(&self) -> Option<&str> {
        match self.data.object.get("customer")? {
            serde_json::Value::String(id) => Some(id.as_str()),
            serde_json::Value::Object(obj) => obj.get("id").and_then(|v| v.as_str()),
            _ => None,
        }
    }

    /// Customer email carried directly in the payload, when present.
    ///
    /// Checkout sessions carry `customer_details.email`; invoices carry
    /// `customer_email`. Subscriptions carry neither.
    pub fn customer_email(&self) -> Option<&str> {
        let object = &self.data.object;
        object
            .get("customer_details")
            .and_then(|d| d.get("email"))
            .and_then(|v| v.as_str())
            .or_else(|| object.get("customer_email").and_then(|v| v.as_str()))
            .or_else(|| {
                object
                    .get("customer")
                    .and_then(|c| c.get("email"))
                    .and_then(|v| v.as_str())
            })
            .filter(|email| !email.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, object: serde_json::Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1_704_067_200,
            "data": { "object": object },
            "livemode": false
        }))
        .unwrap()
    }

    #[test]
    fn parses_known_types() {
        assert_eq!(
            StripeEventType::parse("invoice.payment_succeeded"),
            StripeEventType::InvoicePaid
        );
        assert_eq!(
            StripeEventType::parse("customer.created"),
            StripeEventType::Unknown
        );
        assert!(!StripeEventType::Unknown.affects_membership());
    }

    #[test]
    fn customer_id_handles_expanded_objects() {
        let plain = event("invoice.paid", json!({ "customer": "cus_1" }));
        assert_eq!(plain.customer_id(), Some("cus_1"));

        let expanded = event("invoice.paid", json!({ "customer": { "id": "cus_2" } }));
        assert_eq!(expanded.customer_id(), Some("cus_2"));
    }

    #[test]
    fn customer_email_prefers_checkout_details() {
        let checkout = event(
            "checkout.session.completed",
            json!({ "customer_details": { "email": "a@example.com" }, "customer_email": "b@example.com" }),
        );
        assert_eq!(checkout.customer_email(), Some("a@example.com"));

        let subscription = event("customer.subscription.updated", json!({ "customer": "cus_1" }));
        assert_eq!(subscription.customer_email(), None);
    }

    #[test]
    fn missing_api_version_is_accepted() {
        let e = event("invoice.paid", json!({}));
        assert!(e.api_version.is_none());
    }
}
