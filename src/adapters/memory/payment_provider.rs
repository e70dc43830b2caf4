//! Scriptable in-memory billing provider.
//!
//! Holds customers and subscriptions set up by a test, records calls, and
//! can be told to fail a specific method.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    Customer, PaymentError, PaymentProviderGateway, Refund, RefundRequest, Subscription,
    SubscriptionStatus,
};

#[derive(Default)]
pub struct InMemoryPaymentProvider {
    inner: Mutex<ProviderState>,
}

#[derive(Default)]
struct ProviderState {
    customers: Vec<Customer>,
    subscriptions: HashMap<String, Subscription>,
    refunds: Vec<Refund>,
    method_errors: HashMap<String, PaymentError>,
    call_log: Vec<String>,
}

impl InMemoryPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ProviderState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    /// Adds or replaces a customer.
    pub fn add_customer(&self, customer: Customer) {
        let mut state = self.state();
        state.customers.retain(|c| c.id != customer.id);
        state.customers.push(customer);
    }

    /// Adds or replaces a subscription.
    pub fn put_subscription(&self, subscription: Subscription) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    pub fn set_subscription_status(&self, subscription_id: &str, status: SubscriptionStatus) {
        if let Some(sub) = self.state().subscriptions.get_mut(subscription_id) {
            sub.status = status;
        }
    }

    /// Makes every later call of `method` fail with `error`.
    pub fn fail_method(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<String> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c == method)
    }

    pub fn refunds(&self) -> Vec<Refund> {
        self.state().refunds.clone()
    }

    fn enter(&self, method: &str) -> Result<MutexGuard<'_, ProviderState>, PaymentError> {
        let mut state = self.state();
        state.call_log.push(method.to_string());
        if let Some(err) = state.method_errors.get(method).cloned() {
            return Err(err);
        }
        Ok(state)
    }
}

#[async_trait]
impl PaymentProviderGateway for InMemoryPaymentProvider {
    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError> {
        let state = self.enter("get_customer_by_email")?;
        Ok(state
            .customers
            .iter()
            .filter(|c| {
                c.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        let state = self.enter("get_customer")?;
        Ok(state.customers.iter().find(|c| c.id == customer_id).cloned())
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, PaymentError> {
        let state = self.enter("list_subscriptions")?;
        let mut subs: Vec<Subscription> = state
            .subscriptions
            .values()
            .filter(|s| s.customer_id == customer_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subs)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        let state = self.enter("get_subscription")?;
        Ok(state.subscriptions.get(subscription_id).cloned())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, PaymentError> {
        let mut state = self.enter("cancel_subscription")?;
        let sub = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| PaymentError::not_found("Subscription"))?;
        sub.status = SubscriptionStatus::Canceled;
        sub.cancel_at_period_end = false;
        Ok(sub.clone())
    }

    async fn issue_refund(&self, request: RefundRequest) -> Result<Refund, PaymentError> {
        let mut state = self.enter("issue_refund")?;
        let refund = Refund {
            id: format!("re_{}", state.refunds.len() + 1),
            payment_id: request.payment_id,
            amount: request.amount.unwrap_or(0),
            currency: "usd".to_string(),
            status: "succeeded".to_string(),
        };
        state.refunds.push(refund.clone());
        Ok(refund)
    }
}
