//! MembershipCardLifecycle - derives and persists membership cards.
//!
//! Cards are created lazily from a membership and refreshed in place on
//! every later change. The membership number comes from the store counter
//! and is never re-issued.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::domain::foundation::Timestamp;
use crate::domain::membership::{
    CardVerification, EngineError, Membership, MembershipCard, MembershipNumber, User,
};
use crate::ports::{CardRepository, CounterStore, SaveResult, MEMBERSHIP_NUMBER_COUNTER};

const PAYLOAD_VERSION: &str = "v1";

/// Membership-number format and payload signing key.
#[derive(Clone)]
pub struct CardSettings {
    pub number_prefix: String,
    pub number_width: usize,
    pub signing_secret: SecretString,
}

/// Inputs shared by card creation and update.
#[derive(Debug, Clone, Copy)]
pub struct CardContext<'a> {
    pub user: &'a User,
    pub membership: &'a Membership,
}

/// What a card write did.
#[derive(Debug, Clone, PartialEq)]
pub enum CardOutcome {
    Created(MembershipCard),
    Updated(MembershipCard),
    /// The card already mirrored the membership; nothing written.
    Unchanged(MembershipCard),
}

impl CardOutcome {
    pub fn card(&self) -> &MembershipCard {
        match self {
            CardOutcome::Created(card) | CardOutcome::Updated(card) | CardOutcome::Unchanged(card) => {
                card
            }
        }
    }
}

pub struct MembershipCardLifecycle {
    cards: Arc<dyn CardRepository>,
    counters: Arc<dyn CounterStore>,
    settings: CardSettings,
}

impl MembershipCardLifecycle {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        counters: Arc<dyn CounterStore>,
        settings: CardSettings,
    ) -> Self {
        Self {
            cards,
            counters,
            settings,
        }
    }

    /// Creates the user's card with a freshly allocated membership number.
    ///
    /// If another writer created a card for the user first, that card is
    /// refreshed instead; the allocated number is discarded, never reused.
    #[tracing::instrument(skip(self, ctx), fields(user_id = %ctx.user.id))]
    pub async fn create_card(&self, ctx: CardContext<'_>) -> Result<CardOutcome, EngineError> {
        let sequence = self.counters.increment(MEMBERSHIP_NUMBER_COUNTER).await?;
        let number = MembershipNumber::format(
            &self.settings.number_prefix,
            sequence,
            self.settings.number_width,
        )?;
        let payload = self.verification_payload(&number, &ctx.membership.end_date)?;
        let card = MembershipCard::issue(number, ctx.user, ctx.membership, payload);

        match self.cards.insert(&card).await? {
            SaveResult::Inserted => {
                tracing::info!(membership_number = %card.membership_number, "Membership card created");
                Ok(CardOutcome::Created(card))
            }
            SaveResult::AlreadyExists => {
                tracing::warn!(
                    discarded_number = %card.membership_number,
                    "Card created concurrently; refreshing existing card"
                );
                let existing = self
                    .cards
                    .find_by_user(&ctx.user.id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Membership card", ctx.user.id))?;
                self.update_card(ctx, existing).await
            }
        }
    }

    /// Rewrites status, plan, validity and payload in place.
    #[tracing::instrument(skip(self, ctx, card), fields(membership_number = %card.membership_number))]
    pub async fn update_card(
        &self,
        ctx: CardContext<'_>,
        mut card: MembershipCard,
    ) -> Result<CardOutcome, EngineError> {
        let payload = self.verification_payload(&card.membership_number, &ctx.membership.end_date)?;
        if mirrors(&card, ctx, &payload) {
            return Ok(CardOutcome::Unchanged(card));
        }

        card.refresh(ctx.user, ctx.membership, payload);
        self.cards.update(&card).await?;
        tracing::info!(status = %card.status, "Membership card updated");
        Ok(CardOutcome::Updated(card))
    }

    /// Creates the card if the user has none, else updates it.
    pub async fn sync_card(&self, ctx: CardContext<'_>) -> Result<CardOutcome, EngineError> {
        match self.cards.find_by_user(&ctx.user.id).await? {
            Some(card) => self.update_card(ctx, card).await,
            None => self.create_card(ctx).await,
        }
    }

    /// Read-only lookup for front-of-house checks.
    pub async fn verify_membership(&self, number: &str) -> Result<CardVerification, EngineError> {
        let number = MembershipNumber::parse(number)?;
        let card = self
            .cards
            .find_by_number(&number)
            .await?
            .ok_or_else(|| EngineError::not_found("Membership card", &number))?;

        Ok(CardVerification {
            valid: card.is_valid_at(&Timestamp::now()),
            status: card.status,
            plan_type: card.plan_type,
        })
    }

    /// Checks a scanned payload's signature, then looks the card up.
    ///
    /// A payload for a superseded validity window still verifies against the
    /// current card state, so old printouts keep working.
    pub async fn verify_payload(&self, payload: &str) -> Result<CardVerification, EngineError> {
        let invalid = || EngineError::validation("payload", "Card payload is not authentic");

        let mut parts = payload.trim().splitn(4, '.');
        let (Some(version), Some(number), Some(valid_until), Some(signature)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if version != PAYLOAD_VERSION {
            return Err(invalid());
        }

        let signature = hex::decode(signature).map_err(|_| invalid())?;
        let mut mac = self.mac()?;
        mac.update(signed_part(number, valid_until).as_bytes());
        mac.verify_slice(&signature).map_err(|_| invalid())?;

        self.verify_membership(number).await
    }

    /// `v1.<number>.<valid_until_unix>.<hmac-hex>`
    fn verification_payload(
        &self,
        number: &MembershipNumber,
        valid_until: &Timestamp,
    ) -> Result<String, EngineError> {
        let valid_until = valid_until.as_unix_secs().to_string();
        let signed = signed_part(number.as_str(), &valid_until);
        let mut mac = self.mac()?;
        mac.update(signed.as_bytes());
        Ok(format!(
            "{}.{}",
            signed,
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    fn mac(&self) -> Result<Hmac<Sha256>, EngineError> {
        Hmac::<Sha256>::new_from_slice(self.settings.signing_secret.expose_secret().as_bytes())
            .map_err(|e| EngineError::storage(format!("card signing key unusable: {}", e)))
    }
}

fn signed_part(number: &str, valid_until: &str) -> String {
    format!("{}.{}.{}", PAYLOAD_VERSION, number, valid_until)
}

fn mirrors(card: &MembershipCard, ctx: CardContext<'_>, payload: &str) -> bool {
    card.membership_id == ctx.membership.id
        && card.status == ctx.membership.status
        && card.plan_type == ctx.membership.plan_type
        && card.valid_from == ctx.membership.start_date
        && card.valid_until == ctx.membership.end_date
        && card.member_name == ctx.user.display_name
        && card.email == ctx.user.email
        && card.verification_payload == payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCardRepository, InMemoryCounterStore};
    use crate::domain::membership::{BillingTerms, MembershipStatus, PlanType};

    fn lifecycle() -> MembershipCardLifecycle {
        MembershipCardLifecycle::new(
            Arc::new(InMemoryCardRepository::new()),
            Arc::new(InMemoryCounterStore::new()),
            CardSettings {
                number_prefix: "MEM-".into(),
                number_width: 6,
                signing_secret: SecretString::new("card-secret".into()),
            },
        )
    }

    fn member(email: &str, status: MembershipStatus) -> (User, Membership) {
        let user = User::new(email, "Member", None).unwrap();
        let membership = Membership::new(
            user.id,
            None,
            BillingTerms {
                plan_type: PlanType::Individual,
                status,
                start_date: Timestamp::now().add_days(-1),
                end_date: Timestamp::now().add_days(30),
                auto_renew: true,
            },
        )
        .unwrap();
        (user, membership)
    }

    #[tokio::test]
    async fn create_assigns_sequential_numbers() {
        let lifecycle = lifecycle();
        let (u1, m1) = member("one@example.com", MembershipStatus::Active);
        let (u2, m2) = member("two@example.com", MembershipStatus::Active);

        let c1 = lifecycle
            .create_card(CardContext { user: &u1, membership: &m1 })
            .await
            .unwrap();
        let c2 = lifecycle
            .create_card(CardContext { user: &u2, membership: &m2 })
            .await
            .unwrap();

        assert_eq!(c1.card().membership_number.as_str(), "MEM-000001");
        assert_eq!(c2.card().membership_number.as_str(), "MEM-000002");
    }

    #[tokio::test]
    async fn update_preserves_number_and_skips_no_op_writes() {
        let lifecycle = lifecycle();
        let (user, mut membership) = member("one@example.com", MembershipStatus::Active);
        let ctx = CardContext { user: &user, membership: &membership };
        let created = lifecycle.create_card(ctx).await.unwrap();
        let number = created.card().membership_number.clone();

        let again = lifecycle.sync_card(ctx).await.unwrap();
        assert!(matches!(again, CardOutcome::Unchanged(_)));

        membership.status = MembershipStatus::Canceled;
        let updated = lifecycle
            .sync_card(CardContext { user: &user, membership: &membership })
            .await
            .unwrap();
        assert!(matches!(updated, CardOutcome::Updated(_)));
        assert_eq!(updated.card().membership_number, number);
        assert_eq!(updated.card().status, MembershipStatus::Canceled);
    }

    #[tokio::test]
    async fn second_create_for_same_user_refreshes_existing_card() {
        let lifecycle = lifecycle();
        let (user, membership) = member("one@example.com", MembershipStatus::Active);
        let ctx = CardContext { user: &user, membership: &membership };

        let first = lifecycle.create_card(ctx).await.unwrap();
        let second = lifecycle.create_card(ctx).await.unwrap();
        assert_eq!(
            first.card().membership_number,
            second.card().membership_number
        );
    }

    #[tokio::test]
    async fn verify_membership_reports_validity() {
        let lifecycle = lifecycle();
        let (user, membership) = member("one@example.com", MembershipStatus::Active);
        let created = lifecycle
            .create_card(CardContext { user: &user, membership: &membership })
            .await
            .unwrap();

        let result = lifecycle
            .verify_membership(&created.card().membership_number.to_string().to_lowercase())
            .await
            .unwrap();
        assert!(result.valid);
        assert_eq!(result.status, MembershipStatus::Active);

        let missing = lifecycle.verify_membership("MEM-999999").await.unwrap_err();
        assert_eq!(missing.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn payload_signature_is_checked() {
        let lifecycle = lifecycle();
        let (user, membership) = member("one@example.com", MembershipStatus::Active);
        let created = lifecycle
            .create_card(CardContext { user: &user, membership: &membership })
            .await
            .unwrap();
        let payload = created.card().verification_payload.clone();

        assert!(payload.starts_with("v1.MEM-000001."));
        assert!(lifecycle.verify_payload(&payload).await.unwrap().valid);

        let forged = payload.replace("MEM-000001", "MEM-000002");
        assert_eq!(
            lifecycle.verify_payload(&forged).await.unwrap_err().code(),
            "VALIDATION_ERROR"
        );
    }
}
