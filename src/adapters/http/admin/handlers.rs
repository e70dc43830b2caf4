//! HTTP handlers for the admin API.
//!
//! Each handler passes the caller's bearer token straight to the service,
//! which authorizes before doing anything else.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::admin::{AdjustMembership, DeleteMember, IssueRefund};
use crate::domain::foundation::{MembershipId, UserId};

use super::super::error::ApiError;
use super::super::middleware::BearerToken;
use super::super::state::AppState;
use super::dto::{AuditParams, EmailParams, ImportRequest, ItemsResponse, SearchParams};

/// GET /admin/me
pub async fn whoami(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin.verify_admin(token.as_str()).await?))
}

/// GET /admin/members?q=&page=&page_size=
pub async fn search_members(
    State(state): State<AppState>,
    token: BearerToken,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .admin
        .search_members(token.as_str(), &params.q, params.page, params.page_size)
        .await?;
    Ok(Json(page))
}

/// GET /admin/members/:user_id
pub async fn get_member(
    State(state): State<AppState>,
    token: BearerToken,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin.get_member(token.as_str(), &user_id).await?))
}

/// PATCH /admin/members/:user_id/memberships/:membership_id
pub async fn adjust_membership(
    State(state): State<AppState>,
    token: BearerToken,
    Path((user_id, membership_id)): Path<(UserId, MembershipId)>,
    Json(command): Json<AdjustMembership>,
) -> Result<impl IntoResponse, ApiError> {
    let membership = state
        .admin
        .adjust_membership(token.as_str(), &user_id, &membership_id, command)
        .await?;
    Ok(Json(membership))
}

/// DELETE /admin/members/:user_id
pub async fn delete_member(
    State(state): State<AppState>,
    token: BearerToken,
    Path(user_id): Path<UserId>,
    Json(command): Json<DeleteMember>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .admin
        .delete_member(token.as_str(), &user_id, command)
        .await?;
    Ok(Json(outcome))
}

/// POST /admin/members/import
pub async fn import_members(
    State(state): State<AppState>,
    token: BearerToken,
    Json(request): Json<ImportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .admin
        .bulk_import_members(token.as_str(), request.rows)
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /admin/reconciliation?email=
pub async fn validate_reconciliation(
    State(state): State<AppState>,
    token: BearerToken,
    Query(params): Query<EmailParams>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .admin
        .validate_reconciliation(token.as_str(), &params.email)
        .await?;
    Ok(Json(report))
}

/// POST /admin/reconciliation
pub async fn execute_reconciliation(
    State(state): State<AppState>,
    token: BearerToken,
    Json(request): Json<EmailParams>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .admin
        .execute_reconciliation(token.as_str(), &request.email)
        .await?;
    Ok(Json(result))
}

/// POST /admin/refunds
pub async fn issue_refund(
    State(state): State<AppState>,
    token: BearerToken,
    Json(command): Json<IssueRefund>,
) -> Result<impl IntoResponse, ApiError> {
    let refund = state.admin.issue_refund(token.as_str(), command).await?;
    Ok((StatusCode::CREATED, Json(refund)))
}

/// GET /admin/audit?user_id=&limit=
pub async fn list_audit_entries(
    State(state): State<AppState>,
    token: BearerToken,
    Query(params): Query<AuditParams>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .admin
        .list_audit_entries(token.as_str(), params.user_id.as_ref(), params.limit)
        .await?;
    Ok(Json(ItemsResponse { items }))
}
