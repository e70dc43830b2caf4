//! Billing provider webhook endpoint.
//!
//! The body is read as raw bytes: the signature covers the exact payload,
//! so it must be verified before any JSON parsing.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::domain::webhook::WebhookError;
use crate::ports::WebhookOutcome;

use super::error::WebhookRejection;
use super::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub duplicate: bool,
    pub outcome: Option<WebhookOutcome>,
}

/// POST /webhooks/stripe
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookRejection> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            WebhookRejection(WebhookError::ParseError(
                "missing Stripe-Signature header".to_string(),
            ))
        })?;

    let event = state
        .verifier
        .verify_and_parse(&body, signature)
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook delivery");
            WebhookRejection(e)
        })?;

    let receipt = state.webhooks.process(&event).await.map_err(WebhookRejection)?;

    Ok(Json(WebhookAck {
        received: true,
        duplicate: !receipt.admitted,
        outcome: receipt.outcome,
    }))
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}
