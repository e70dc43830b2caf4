//! Axum router for the admin API.

use axum::routing::{get, patch, post};
use axum::Router;

use super::super::state::AppState;
use super::handlers::{
    adjust_membership, delete_member, execute_reconciliation, get_member, import_members,
    issue_refund, list_audit_entries, search_members, validate_reconciliation, whoami,
};

/// Admin routes, mounted under `/admin`.
///
/// # Routes
/// - `GET /me` - resolve the caller as an admin
/// - `GET /members` - search members
/// - `POST /members/import` - bulk import legacy members
/// - `GET /members/:user_id` - member details
/// - `DELETE /members/:user_id` - soft-delete a member
/// - `PATCH /members/:user_id/memberships/:membership_id` - adjust a membership
/// - `GET /reconciliation?email=` - report without writing
/// - `POST /reconciliation` - reconcile one email
/// - `POST /refunds` - refund a payment
/// - `GET /audit` - audit trail
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(whoami))
        .route("/members", get(search_members))
        .route("/members/import", post(import_members))
        .route("/members/:user_id", get(get_member).delete(delete_member))
        .route(
            "/members/:user_id/memberships/:membership_id",
            patch(adjust_membership),
        )
        .route(
            "/reconciliation",
            get(validate_reconciliation).post(execute_reconciliation),
        )
        .route("/refunds", post(issue_refund))
        .route("/audit", get(list_audit_entries))
}
