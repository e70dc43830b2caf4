//! Cross-component properties: idempotence, card-number stability, counter
//! uniqueness and exactly-once webhook admission.

mod common;

use std::collections::HashSet;

use futures::future::join_all;
use serde_json::json;

use club_membership::application::card_lifecycle::CardContext;
use club_membership::domain::membership::{
    BillingTerms, Membership, MembershipStatus, PlanType, User,
};
use club_membership::domain::reconciliation::DiscrepancyTag;
use club_membership::domain::webhook::{sign_payload, StripeWebhookVerifier};
use club_membership::ports::{SubscriptionStatus, WebhookOutcome};
use secrecy::SecretString;

use common::{ts, Engine, EMAIL, PERIOD_END, PERIOD_START};

#[tokio::test]
async fn second_reconciliation_finds_nothing_to_do() {
    let engine = Engine::new();
    engine.bill_ada(SubscriptionStatus::Active, PlanType::Family, PERIOD_END);

    let first = engine.executor.reconcile(EMAIL, None).await.unwrap();
    assert!(first.success);
    let audits_after_first = engine.audit_count().await;

    let report = engine.executor.validate(EMAIL).await.unwrap();
    assert_eq!(report.tags, vec![DiscrepancyTag::NoDiscrepancy]);
    assert!(!report.can_reconcile);

    let second = engine.executor.reconcile(EMAIL, None).await.unwrap();
    assert!(second.success);
    assert!(second.actions_performed.is_empty());
    assert!(!second.wrote_anything());
    assert_eq!(engine.audit_count().await, audits_after_first);
}

#[tokio::test]
async fn membership_number_survives_every_later_run() {
    let engine = Engine::new();
    engine.bill_ada(SubscriptionStatus::Active, PlanType::Individual, PERIOD_END);
    engine.executor.reconcile(EMAIL, None).await.unwrap();
    let user = engine.store.users.find_by_email(EMAIL).await.unwrap().unwrap();
    let original = engine
        .store
        .cards
        .find_by_user(&user.id)
        .await
        .unwrap()
        .unwrap()
        .membership_number;

    let renewals = [
        (SubscriptionStatus::Active, PlanType::Family, PERIOD_END + 365 * 86_400),
        (SubscriptionStatus::PastDue, PlanType::Family, PERIOD_END + 365 * 86_400),
        (SubscriptionStatus::Canceled, PlanType::Family, PERIOD_END + 365 * 86_400),
    ];
    for (status, plan, end) in renewals {
        engine.bill_ada(status, plan, end);
        engine.executor.reconcile(EMAIL, None).await.unwrap();

        let card = engine.store.cards.find_by_user(&user.id).await.unwrap().unwrap();
        assert_eq!(card.membership_number, original);
        assert_eq!(card.status, status.to_membership_status());
    }
}

#[tokio::test]
async fn concurrent_card_creation_allocates_distinct_numbers() {
    const MEMBERS: usize = 25;
    let engine = Engine::new();

    let members: Vec<(User, Membership)> = (0..MEMBERS)
        .map(|i| {
            let user = User::new(
                &format!("member{}@example.com", i),
                format!("Member {}", i),
                None,
            )
            .unwrap();
            let membership = Membership::new(
                user.id,
                None,
                BillingTerms {
                    plan_type: PlanType::Individual,
                    status: MembershipStatus::Complimentary,
                    start_date: ts(PERIOD_START),
                    end_date: ts(PERIOD_END),
                    auto_renew: false,
                },
            )
            .unwrap();
            (user, membership)
        })
        .collect();

    let outcomes = join_all(members.iter().map(|(user, membership)| {
        engine.cards.create_card(CardContext { user, membership })
    }))
    .await;

    let numbers: HashSet<String> = outcomes
        .into_iter()
        .map(|outcome| outcome.unwrap().card().membership_number.as_str().to_string())
        .collect();
    assert_eq!(numbers.len(), MEMBERS);
}

#[tokio::test]
async fn replayed_event_id_is_admitted_once() {
    let engine = Engine::new();
    let payload = json!({ "id": "evt_replay" });

    let first = engine
        .guard
        .admit("evt_replay", "invoice.paid", payload.clone())
        .await
        .unwrap();
    let second = engine
        .guard
        .admit("evt_replay", "invoice.paid", payload)
        .await
        .unwrap();

    assert!(first.admitted);
    assert!(!second.admitted);
}

#[tokio::test]
async fn verified_subscription_webhook_reconciles_once() {
    let engine = Engine::new();
    engine.bill_ada(SubscriptionStatus::Active, PlanType::Individual, PERIOD_END);
    let secret = "whsec_integration";
    let verifier = StripeWebhookVerifier::new(SecretString::new(secret.into()));
    let body = json!({
        "id": "evt_sub_updated",
        "type": "customer.subscription.updated",
        "created": PERIOD_START,
        "data": { "object": { "id": "sub_ada", "customer": "cus_ada" } },
        "livemode": false
    })
    .to_string();
    let header = sign_payload(secret, chrono::Utc::now().timestamp(), &body);

    let event = verifier.verify_and_parse(body.as_bytes(), &header).unwrap();
    let first = engine.webhooks.process(&event).await.unwrap();
    let second = engine.webhooks.process(&event).await.unwrap();

    assert_eq!(first.outcome, Some(WebhookOutcome::Success));
    assert!(!second.admitted);
    assert!(engine.store.users.find_by_email(EMAIL).await.unwrap().is_some());

    let record = engine
        .store
        .webhook_events
        .find_by_event_id("evt_sub_updated")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.outcome, WebhookOutcome::Success);
}
