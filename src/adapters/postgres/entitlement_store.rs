//! PostgreSQL implementation of EntitlementStore.
//!
//! Every operation is a single statement, so each write is atomic without an
//! explicit transaction.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::{normalize_username, user_not_found, Entitlement, PremiumGrant, UserProfile};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::EntitlementStore;

use super::rows::{database_error, UserRow, USER_COLUMNS};

pub struct PostgresEntitlementStore {
    pool: PgPool,
}

impl PostgresEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementStore for PostgresEntitlementStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        let sql = format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error("fetch user"))?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Entitlement>, DomainError> {
        let Some(username) = normalize_username(username) else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT {} FROM users WHERE lower(username) = $1 ORDER BY last_activity DESC LIMIT 1",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error("find user by username"))?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn upsert_new_user(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<Entitlement, DomainError> {
        let now = Timestamp::now();
        let sql = format!(
            r#"
            INSERT INTO users (user_id, username, first_name, registered_at, last_activity)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                username = COALESCE(EXCLUDED.username, users.username),
                first_name = COALESCE(EXCLUDED.first_name, users.first_name),
                last_activity = EXCLUDED.last_activity
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(profile.username.as_deref())
            .bind(profile.first_name.as_deref())
            .bind(now.as_datetime())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error("upsert user"))?;

        Entitlement::try_from(row)
    }

    async fn set_premium(
        &self,
        user_id: &UserId,
        grant: PremiumGrant,
    ) -> Result<Entitlement, DomainError> {
        let (is_premium, until) = grant.resolve(Timestamp::now());
        let sql = format!(
            "UPDATE users SET is_premium = $2, premium_until = $3 WHERE user_id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(is_premium)
            .bind(until.map(|t| *t.as_datetime()))
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error("set premium"))?;

        match row {
            Some(row) => Entitlement::try_from(row),
            None => Err(user_not_found(user_id)),
        }
    }

    async fn set_trial_used(&self, user_id: &UserId) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE users SET trial_used = TRUE WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(database_error("mark trial used"))?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(user_id));
        }
        Ok(())
    }

    async fn save_instrument(
        &self,
        user_id: &UserId,
        instrument_ref: Option<&str>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE users SET instrument_ref = $2 WHERE user_id = $1")
            .bind(user_id.as_str())
            .bind(instrument_ref)
            .execute(&self.pool)
            .await
            .map_err(database_error("save payment instrument"))?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(user_id));
        }
        Ok(())
    }

    async fn is_currently_premium(&self, user_id: &UserId) -> Result<bool, DomainError> {
        // The CTE clears a lapsed flag; the outer SELECT sees the pre-update
        // snapshot, so it evaluates expiry itself.
        let active: Option<bool> = sqlx::query_scalar(
            r#"
            WITH expired AS (
                UPDATE users SET is_premium = FALSE
                WHERE user_id = $1
                  AND is_premium
                  AND premium_until IS NOT NULL
                  AND premium_until <= $2
                RETURNING user_id
            )
            SELECT is_premium AND (premium_until IS NULL OR premium_until > $2)
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .bind(*Timestamp::now().as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error("check premium status"))?;

        Ok(active.unwrap_or(false))
    }

    async fn find_due_for_renewal(&self, now: Timestamp) -> Result<Vec<Entitlement>, DomainError> {
        let sql = format!(
            r#"
            SELECT {} FROM users
            WHERE is_premium
              AND premium_until IS NOT NULL
              AND premium_until <= $1
              AND instrument_ref IS NOT NULL
            ORDER BY premium_until
            "#,
            USER_COLUMNS
        );
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(now.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("find renewals due"))?;

        rows.into_iter().map(Entitlement::try_from).collect()
    }
}
