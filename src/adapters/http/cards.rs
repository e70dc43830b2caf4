//! Public card verification endpoints used at the door.

use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyPayloadRequest {
    pub payload: String,
}

/// GET /cards/:number/verify
pub async fn verify_card_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.cards.verify_membership(&number).await?))
}

/// POST /cards/verify
pub async fn verify_card_payload(
    State(state): State<AppState>,
    Json(request): Json<VerifyPayloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.cards.verify_payload(&request.payload).await?))
}

pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/verify", post(verify_card_payload))
        .route("/:number/verify", get(verify_card_number))
}
