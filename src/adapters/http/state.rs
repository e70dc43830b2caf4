//! Shared handler state.

use std::sync::Arc;

use crate::application::admin::AdminMembershipService;
use crate::application::card_lifecycle::MembershipCardLifecycle;
use crate::application::webhook::WebhookProcessor;
use crate::domain::webhook::StripeWebhookVerifier;

/// Cloned per request; every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub admin: Arc<AdminMembershipService>,
    pub cards: Arc<MembershipCardLifecycle>,
    pub webhooks: Arc<WebhookProcessor>,
    pub verifier: Arc<StripeWebhookVerifier>,
}
