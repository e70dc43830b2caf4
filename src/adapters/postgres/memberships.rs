//! PostgreSQL implementation of MembershipRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, MembershipId, Timestamp, UserId};
use crate::domain::membership::Membership;
use crate::ports::{MembershipRepository, SaveResult};

use super::{corrupt_column, query_failed};

pub struct PostgresMembershipRepository {
    pool: PgPool,
}

impl PostgresMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    id: Uuid,
    user_id: Uuid,
    billing_subscription_id: Option<String>,
    plan_type: String,
    status: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    auto_renew: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DomainError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            id: MembershipId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            billing_subscription_id: row.billing_subscription_id,
            plan_type: row
                .plan_type
                .parse()
                .map_err(|e| corrupt_column("plan_type", e))?,
            status: row.status.parse().map_err(|e| corrupt_column("status", e))?,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: Timestamp::from_datetime(row.end_date),
            auto_renew: row.auto_renew,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const COLUMNS: &str = "id, user_id, billing_subscription_id, plan_type, status, \
                       start_date, end_date, auto_renew, created_at, updated_at";

#[async_trait]
impl MembershipRepository for PostgresMembershipRepository {
    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError> {
        let row: Option<MembershipRow> =
            sqlx::query_as(&format!("SELECT {} FROM memberships WHERE id = $1", COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| query_failed("find membership", e))?;
        row.map(Membership::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError> {
        let rows: Vec<MembershipRow> = sqlx::query_as(&format!(
            "SELECT {} FROM memberships WHERE user_id = $1 ORDER BY end_date DESC, created_at DESC",
            COLUMNS
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list memberships", e))?;
        rows.into_iter().map(Membership::try_from).collect()
    }

    async fn find_by_subscription(
        &self,
        user_id: &UserId,
        subscription_id: &str,
    ) -> Result<Option<Membership>, DomainError> {
        let row: Option<MembershipRow> = sqlx::query_as(&format!(
            "SELECT {} FROM memberships WHERE user_id = $1 AND billing_subscription_id = $2",
            COLUMNS
        ))
        .bind(user_id.as_uuid())
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find membership by subscription", e))?;
        row.map(Membership::try_from).transpose()
    }

    async fn insert(&self, membership: &Membership) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO memberships (
                id, user_id, billing_subscription_id, plan_type, status,
                start_date, end_date, auto_renew, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(membership.id.as_uuid())
        .bind(membership.user_id.as_uuid())
        .bind(&membership.billing_subscription_id)
        .bind(membership.plan_type.as_str())
        .bind(membership.status.as_str())
        .bind(membership.start_date.as_datetime())
        .bind(membership.end_date.as_datetime())
        .bind(membership.auto_renew)
        .bind(membership.created_at.as_datetime())
        .bind(membership.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("insert membership", e))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }

    async fn update(&self, membership: &Membership) -> Result<(), DomainError> {
        // Identity, owner and subscription id are never rewritten.
        let result = sqlx::query(
            r#"
            UPDATE memberships SET
                plan_type = $2,
                status = $3,
                start_date = $4,
                end_date = $5,
                auto_renew = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(membership.id.as_uuid())
        .bind(membership.plan_type.as_str())
        .bind(membership.status.as_str())
        .bind(membership.start_date.as_datetime())
        .bind(membership.end_date.as_datetime())
        .bind(membership.auto_renew)
        .bind(membership.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update membership", e))?;

        if result.rows_affected() == 0 {
            return Err(
                DomainError::new(ErrorCode::MembershipNotFound, "Membership not found")
                    .with_detail("id", membership.id.to_string()),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::membership::{MembershipStatus, PlanType};

    fn row(plan: &str, status: &str) -> MembershipRow {
        let now = Utc::now();
        MembershipRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            billing_subscription_id: Some("sub_1".into()),
            plan_type: plan.into(),
            status: status.into(),
            start_date: now,
            end_date: now,
            auto_renew: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_membership() {
        let membership = Membership::try_from(row("family", "past_due")).unwrap();
        assert_eq!(membership.plan_type, PlanType::Family);
        assert_eq!(membership.status, MembershipStatus::PastDue);
        assert_eq!(membership.billing_subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn unknown_stored_status_is_a_database_error() {
        let err = Membership::try_from(row("family", "expired")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
