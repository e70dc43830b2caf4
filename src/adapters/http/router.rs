//! Top-level router assembly.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::admin::admin_routes;
use super::cards::card_routes;
use super::state::AppState;
use super::webhooks::webhook_routes;

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the full HTTP surface.
///
/// - `/health`
/// - `/admin/*` - bearer-authenticated admin API
/// - `/cards/*` - public card verification
/// - `/webhooks/stripe` - signed billing events
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/admin", admin_routes())
        .nest("/cards", card_routes())
        .nest("/webhooks", webhook_routes())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::memory::{in_memory_record_store, InMemoryPaymentProvider};
    use crate::application::admin::{admin_authorizer, AdminMembershipService, AdminSettings};
    use crate::application::card_lifecycle::{CardSettings, MembershipCardLifecycle};
    use crate::application::reconciliation::{ReconciliationExecutor, SnapshotLoader};
    use crate::application::webhook::{WebhookIdempotencyGuard, WebhookProcessor};
    use crate::domain::membership::PlanType;
    use crate::domain::webhook::{sign_payload, StripeWebhookVerifier};
    use crate::ports::{Customer, RecordStore, Subscription, SubscriptionStatus};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use secrecy::SecretString;
    use std::sync::Arc;
    use tower::ServiceExt;

    const WEBHOOK_SECRET: &str = "whsec_router_test";
    const ADMIN: &str = "admin-token";
    const MEMBER: &str = "member-token";

    fn app() -> (Router, RecordStore) {
        let store = in_memory_record_store();
        let provider = Arc::new(InMemoryPaymentProvider::new());
        provider.add_customer(Customer {
            id: "cus_1".into(),
            email: Some("ada@example.com".into()),
            name: Some("Ada Lovelace".into()),
            created_at: 1,
        });
        provider.put_subscription(Subscription {
            id: "sub_1".into(),
            customer_id: "cus_1".into(),
            status: SubscriptionStatus::Active,
            plan_type: Some(PlanType::Family),
            current_period_start: 1_735_689_600,
            current_period_end: 1_767_139_200,
            cancel_at_period_end: false,
            created_at: 1,
        });

        let cards = Arc::new(MembershipCardLifecycle::new(
            store.cards.clone(),
            store.counters.clone(),
            CardSettings {
                number_prefix: "MEM-".into(),
                number_width: 6,
                signing_secret: SecretString::new("card-key".into()),
            },
        ));
        let executor = Arc::new(ReconciliationExecutor::new(
            SnapshotLoader::new(provider.clone(), store.clone()),
            store.clone(),
            cards.clone(),
        ));
        let sessions = Arc::new(
            MockSessionValidator::new()
                .with_admin(ADMIN, "admin@club.example")
                .with_member(MEMBER, "member@club.example"),
        );
        let admin = Arc::new(AdminMembershipService::new(
            admin_authorizer(sessions, None),
            store.clone(),
            provider.clone(),
            executor.clone(),
            cards.clone(),
            AdminSettings::default(),
        ));
        let guard = Arc::new(WebhookIdempotencyGuard::new(store.webhook_events.clone()));
        let webhooks = Arc::new(WebhookProcessor::new(guard, provider, executor));

        let state = AppState {
            admin,
            cards,
            webhooks,
            verifier: Arc::new(StripeWebhookVerifier::new(SecretString::new(
                WEBHOOK_SECRET.into(),
            ))),
        };
        (app_router(state), store)
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn webhook(payload: &str, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhooks/stripe")
            .header("stripe-signature", signature)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    fn invoice_paid(event_id: &str) -> String {
        json!({
            "id": event_id,
            "type": "invoice.paid",
            "created": 1_704_067_200,
            "data": { "object": { "customer_email": "ada@example.com" } },
            "livemode": false
        })
        .to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = app();
        let response = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let (app, _) = app();
        let response = app.oneshot(get("/health", None)).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn admin_routes_require_a_bearer_token() {
        let (app, _) = app();
        let response = app.oneshot(get("/admin/me", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "SESSION_ERROR");
    }

    #[tokio::test]
    async fn member_tokens_are_refused_by_admin_routes() {
        let (app, _) = app();
        let response = app.oneshot(get("/admin/me", Some(MEMBER))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn admin_token_resolves_principal() {
        let (app, _) = app();
        let response = app.oneshot(get("/admin/me", Some(ADMIN))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["email"], "admin@club.example");
    }

    #[tokio::test]
    async fn invalid_paging_is_a_bad_request() {
        let (app, _) = app();
        let response = app
            .oneshot(get("/admin/members?page=0", Some(ADMIN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["field"], "page");
    }

    #[tokio::test]
    async fn reconciliation_report_is_read_only() {
        let (app, store) = app();
        let response = app
            .oneshot(get("/admin/reconciliation?email=ada@example.com", Some(ADMIN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(store.users.find_by_email("ada@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn signed_webhook_is_processed_once() {
        let (app, store) = app();
        let payload = invoice_paid("evt_http_1");
        let signature = sign_payload(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), &payload);

        let first = app
            .clone()
            .oneshot(webhook(&payload, &signature))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first = json_body(first).await;
        assert_eq!(first["duplicate"], false);
        assert_eq!(first["outcome"], "success");
        assert!(store.users.find_by_email("ada@example.com").await.unwrap().is_some());

        let second = app.oneshot(webhook(&payload, &signature)).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(json_body(second).await["duplicate"], true);
    }

    #[tokio::test]
    async fn forged_webhook_is_rejected() {
        let (app, store) = app();
        let payload = invoice_paid("evt_http_2");
        let signature = sign_payload("wrong-secret", chrono::Utc::now().timestamp(), &payload);

        let response = app.oneshot(webhook(&payload, &signature)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(store
            .webhook_events
            .find_by_event_id("evt_http_2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn webhook_without_signature_is_a_bad_request() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/stripe")
                    .body(Body::from(invoice_paid("evt_http_3")))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_card_number_is_not_found() {
        let (app, _) = app();
        let response = app
            .oneshot(get("/cards/MEM-999999/verify", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reconciled_member_card_verifies() {
        let (app, _) = app();
        let execute = Request::builder()
            .method("POST")
            .uri("/admin/reconciliation")
            .header("authorization", format!("Bearer {}", ADMIN))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "email": "ada@example.com" }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(execute).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get("/cards/mem-000001/verify", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["plan_type"], "family");
    }
}
