//! JSON error responses.
//!
//! Every failure leaves the API as `{ "code", "message", "details"? }` with
//! a status derived from the engine error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::domain::membership::EngineError;
use crate::domain::webhook::WebhookError;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable kind.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Engine error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthorized(_) | EngineError::Session(_) => StatusCode::UNAUTHORIZED,
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::Validation { .. } => StatusCode::BAD_REQUEST,
        EngineError::Provider(_) => StatusCode::BAD_GATEWAY,
        EngineError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Storage(_) | EngineError::ReconciliationAborted { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::Conflict { .. } => StatusCode::CONFLICT,
        EngineError::Admin { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, code = err.code(), "Request failed");
        }

        let mut body = ErrorResponse::new(err.code(), err.to_string());
        match &err {
            EngineError::Validation { field, .. } => {
                body = body.with_details(json!({ "field": field }));
            }
            EngineError::Conflict {
                subscription_id: Some(id),
                ..
            } => {
                body = body.with_details(json!({ "subscription_id": id }));
            }
            EngineError::ReconciliationAborted { step, partial, .. } => {
                body = body.with_details(json!({ "step": step, "partial": partial }));
            }
            _ => {}
        }
        (status, Json(body)).into_response()
    }
}

/// Webhook rejection. Only processing failures ask the provider to retry.
#[derive(Debug)]
pub struct WebhookRejection(pub WebhookError);

impl From<WebhookError> for WebhookRejection {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            WebhookError::InvalidSignature => (StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE"),
            WebhookError::TimestampOutOfRange | WebhookError::InvalidTimestamp => {
                (StatusCode::BAD_REQUEST, "INVALID_TIMESTAMP")
            }
            WebhookError::ParseError(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
            WebhookError::Processing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR"),
        };
        if self.0.is_retryable() {
            tracing::error!(error = %self.0, "Webhook processing failed; provider will retry");
        } else {
            tracing::warn!(error = %self.0, "Webhook rejected");
        }
        (status, Json(ErrorResponse::new(code, self.0.to_string()))).into_response()
    }
}
