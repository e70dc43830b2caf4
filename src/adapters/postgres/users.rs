//! PostgreSQL implementation of UserRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::membership::User;
use crate::ports::{SaveResult, UserPage, UserRepository};

use super::{query_failed, to_i64};

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    billing_customer_id: Option<String>,
    email: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            billing_customer_id: row.billing_customer_id,
            email: row.email,
            display_name: row.display_name,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

const COLUMNS: &str = "id, billing_customer_id, email, display_name, created_at";

/// `%needle%` with LIKE wildcards in the needle escaped.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| query_failed("find user", e))?;
        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = lower($1)", COLUMNS))
                .bind(email.trim())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| query_failed("find user by email", e))?;
        Ok(row.map(User::from))
    }

    async fn insert(&self, user: &User) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, billing_customer_id, email, display_name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.billing_customer_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("insert user", e))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }

    async fn update(&self, user: &User) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                billing_customer_id = $2,
                email = $3,
                display_name = $4
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.billing_customer_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update user", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("id", user.id.to_string()));
        }
        Ok(())
    }

    async fn search(&self, query: &str, offset: u64, limit: u64) -> Result<UserPage, DomainError> {
        let pattern = contains_pattern(query.trim());
        let filter = "email ILIKE $1 OR display_name ILIKE $1";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {}", filter))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_failed("count users", e))?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE {} ORDER BY created_at DESC, email LIMIT $2 OFFSET $3",
            COLUMNS, filter
        ))
        .bind(&pattern)
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("search users", e))?;

        Ok(UserPage {
            items: rows.into_iter().map(User::from).collect(),
            total: u64::try_from(total).unwrap_or(0),
        })
    }
}
