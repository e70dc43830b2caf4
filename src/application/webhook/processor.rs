//! WebhookProcessor - turns admitted provider events into reconciliations.
//!
//! Every membership-affecting event resolves the customer's email and runs
//! the executor with no actor. The ledger entry records the outcome.

use std::sync::Arc;

use crate::application::reconciliation::ReconciliationExecutor;
use crate::domain::membership::EngineError;
use crate::domain::webhook::{StripeEvent, WebhookError};
use crate::ports::{PaymentProviderGateway, WebhookOutcome};

use super::{Admission, WebhookIdempotencyGuard};

/// Result of one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReceipt {
    pub admitted: bool,
    /// `None` for duplicates, which are not processed.
    pub outcome: Option<WebhookOutcome>,
}

pub struct WebhookProcessor {
    guard: Arc<WebhookIdempotencyGuard>,
    gateway: Arc<dyn PaymentProviderGateway>,
    executor: Arc<ReconciliationExecutor>,
}

impl WebhookProcessor {
    pub fn new(
        guard: Arc<WebhookIdempotencyGuard>,
        gateway: Arc<dyn PaymentProviderGateway>,
        executor: Arc<ReconciliationExecutor>,
    ) -> Self {
        Self {
            guard,
            gateway,
            executor,
        }
    }

    /// Processes an event given as id, type and full JSON body.
    pub async fn process_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<WebhookReceipt, WebhookError> {
        let event: StripeEvent =
            serde_json::from_value(payload).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        if event.id != event_id || event.event_type != event_type {
            return Err(WebhookError::ParseError(
                "event id or type does not match the payload".to_string(),
            ));
        }
        self.process(&event).await
    }

    /// Processes a verified event exactly once.
    ///
    /// Permanent processing failures are recorded in the ledger and do not
    /// surface as errors: the event is acknowledged and left for an operator
    /// to reconcile by hand. Retryable failures (provider unreachable,
    /// storage down) release the ledger entry and return
    /// `WebhookError::Processing`, so the provider redelivers. Ledger
    /// failures are returned the same way.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn process(&self, event: &StripeEvent) -> Result<WebhookReceipt, WebhookError> {
        let payload = serde_json::to_value(event)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let Admission { admitted } = self
            .guard
            .admit(&event.id, &event.event_type, payload)
            .await
            .map_err(|e| WebhookError::Processing(e.to_string()))?;
        if !admitted {
            return Ok(WebhookReceipt {
                admitted: false,
                outcome: None,
            });
        }

        let (outcome, message) = match self.handle(event).await {
            Ok(Handled::Reconciled(email)) => {
                tracing::info!(email = %email, "Webhook reconciled");
                (WebhookOutcome::Success, None)
            }
            Ok(Handled::Ignored(reason)) => {
                tracing::debug!(reason = %reason, "Webhook ignored");
                (WebhookOutcome::Ignored, Some(reason))
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "Webhook processing failed transiently");
                self.guard
                    .release(&event.id)
                    .await
                    .map_err(|ledger| WebhookError::Processing(ledger.to_string()))?;
                return Err(WebhookError::Processing(e.to_string()));
            }
            Err(e) => {
                tracing::error!(error = %e, "Webhook processing failed");
                (WebhookOutcome::Failed, Some(e.to_string()))
            }
        };

        self.guard
            .complete(&event.id, outcome, message)
            .await
            .map_err(|e| WebhookError::Processing(e.to_string()))?;

        Ok(WebhookReceipt {
            admitted: true,
            outcome: Some(outcome),
        })
    }

    async fn handle(&self, event: &StripeEvent) -> Result<Handled, EngineError> {
        let event_type = event.parsed_type();
        if !event_type.affects_membership() {
            return Ok(Handled::Ignored(format!(
                "event type {} is not handled",
                event.event_type
            )));
        }

        let Some(email) = self.resolve_email(event).await? else {
            return Ok(Handled::Ignored("event references no customer email".to_string()));
        };

        let result = self.executor.reconcile(&email, None).await?;
        if !result.success {
            return Err(EngineError::admin("NOT_RECONCILABLE", result.message));
        }
        Ok(Handled::Reconciled(email))
    }

    /// Email from the payload, else from the provider's customer record.
    async fn resolve_email(&self, event: &StripeEvent) -> Result<Option<String>, EngineError> {
        if let Some(email) = event.customer_email() {
            return Ok(Some(email.to_string()));
        }
        let Some(customer_id) = event.customer_id() else {
            return Ok(None);
        };
        let customer = self
            .gateway
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Billing customer", customer_id))?;
        Ok(customer.email)
    }
}

enum Handled {
    Reconciled(String),
    Ignored(String),
}
