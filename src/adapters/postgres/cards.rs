//! PostgreSQL implementation of CardRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{CardId, DomainError, ErrorCode, MembershipId, Timestamp, UserId};
use crate::domain::membership::{MembershipCard, MembershipNumber};
use crate::ports::{CardRepository, SaveResult};

use super::{corrupt_column, query_failed};

pub struct PostgresCardRepository {
    pool: PgPool,
}

impl PostgresCardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CardRow {
    id: Uuid,
    user_id: Uuid,
    membership_id: Uuid,
    membership_number: String,
    member_name: String,
    email: String,
    plan_type: String,
    status: String,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    verification_payload: String,
    document_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CardRow> for MembershipCard {
    type Error = DomainError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        Ok(MembershipCard {
            id: CardId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            membership_id: MembershipId::from_uuid(row.membership_id),
            membership_number: MembershipNumber::parse(&row.membership_number)
                .map_err(|e| corrupt_column("membership_number", e))?,
            member_name: row.member_name,
            email: row.email,
            plan_type: row
                .plan_type
                .parse()
                .map_err(|e| corrupt_column("plan_type", e))?,
            status: row.status.parse().map_err(|e| corrupt_column("status", e))?,
            valid_from: Timestamp::from_datetime(row.valid_from),
            valid_until: Timestamp::from_datetime(row.valid_until),
            verification_payload: row.verification_payload,
            document_ref: row.document_ref,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const COLUMNS: &str = "id, user_id, membership_id, membership_number, member_name, email, \
                       plan_type, status, valid_from, valid_until, verification_payload, \
                       document_ref, created_at, updated_at";

#[async_trait]
impl CardRepository for PostgresCardRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<MembershipCard>, DomainError> {
        let row: Option<CardRow> =
            sqlx::query_as(&format!("SELECT {} FROM membership_cards WHERE user_id = $1", COLUMNS))
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| query_failed("find card", e))?;
        row.map(MembershipCard::try_from).transpose()
    }

    async fn find_by_number(
        &self,
        number: &MembershipNumber,
    ) -> Result<Option<MembershipCard>, DomainError> {
        let row: Option<CardRow> = sqlx::query_as(&format!(
            "SELECT {} FROM membership_cards WHERE membership_number = $1",
            COLUMNS
        ))
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find card by number", e))?;
        row.map(MembershipCard::try_from).transpose()
    }

    async fn insert(&self, card: &MembershipCard) -> Result<SaveResult, DomainError> {
        // Only the per-user key is absorbed; a number collision is a real error.
        let result = sqlx::query(
            r#"
            INSERT INTO membership_cards (
                id, user_id, membership_id, membership_number, member_name, email,
                plan_type, status, valid_from, valid_until, verification_payload,
                document_ref, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(card.id.as_uuid())
        .bind(card.user_id.as_uuid())
        .bind(card.membership_id.as_uuid())
        .bind(card.membership_number.as_str())
        .bind(&card.member_name)
        .bind(&card.email)
        .bind(card.plan_type.as_str())
        .bind(card.status.as_str())
        .bind(card.valid_from.as_datetime())
        .bind(card.valid_until.as_datetime())
        .bind(&card.verification_payload)
        .bind(&card.document_ref)
        .bind(card.created_at.as_datetime())
        .bind(card.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("insert card", e))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }

    async fn update(&self, card: &MembershipCard) -> Result<(), DomainError> {
        // membership_number is write-once and never in the SET list.
        let result = sqlx::query(
            r#"
            UPDATE membership_cards SET
                membership_id = $2,
                member_name = $3,
                email = $4,
                plan_type = $5,
                status = $6,
                valid_from = $7,
                valid_until = $8,
                verification_payload = $9,
                document_ref = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(card.id.as_uuid())
        .bind(card.membership_id.as_uuid())
        .bind(&card.member_name)
        .bind(&card.email)
        .bind(card.plan_type.as_str())
        .bind(card.status.as_str())
        .bind(card.valid_from.as_datetime())
        .bind(card.valid_until.as_datetime())
        .bind(&card.verification_payload)
        .bind(&card.document_ref)
        .bind(card.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update card", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::CardNotFound, "Membership card not found")
                .with_detail("id", card.id.to_string()));
        }
        Ok(())
    }
}
