//! PostgreSQL implementation of GiftLedger.
//!
//! Redemption locks the gift row and the recipient row in one transaction, so
//! concurrent redeemers of the same code serialize and exactly one wins. A code
//! whose payment has not succeeded is refused before anything is written.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::{user_not_found, Entitlement, Gift, PremiumGrant, RedeemRejection};
use crate::domain::foundation::{DomainError, GiftCode, Timestamp, UserId};
use crate::ports::{GiftLedger, RedeemOutcome};

use super::rows::{database_error, GiftRow, UserRow, GIFT_COLUMNS, USER_COLUMNS};

pub struct PostgresGiftLedger {
    pool: PgPool,
}

impl PostgresGiftLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GiftLedger for PostgresGiftLedger {
    async fn create(&self, gift: &Gift) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO gift_codes (code, sender_id, is_redeemed, created_at)
            VALUES ($1, $2, FALSE, $3)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(gift.code.as_str())
        .bind(gift.sender_id.as_str())
        .bind(gift.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(database_error("create gift code"))?;

        Ok(())
    }

    async fn get(&self, code: &GiftCode) -> Result<Option<Gift>, DomainError> {
        let sql = format!("SELECT {} FROM gift_codes WHERE code = $1", GIFT_COLUMNS);
        let row: Option<GiftRow> = sqlx::query_as(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error("fetch gift code"))?;

        row.map(Gift::try_from).transpose()
    }

    async fn mark_paid(&self, gift: &Gift) -> Result<Gift, DomainError> {
        let paid_at = gift.paid_at.unwrap_or_else(Timestamp::now);
        let sql = format!(
            r#"
            INSERT INTO gift_codes (code, sender_id, is_paid, paid_at, is_redeemed, created_at)
            VALUES ($1, $2, TRUE, $3, FALSE, $4)
            ON CONFLICT (code) DO UPDATE
                SET is_paid = TRUE,
                    paid_at = COALESCE(gift_codes.paid_at, EXCLUDED.paid_at)
            RETURNING {}
            "#,
            GIFT_COLUMNS
        );
        let row: GiftRow = sqlx::query_as(&sql)
            .bind(gift.code.as_str())
            .bind(gift.sender_id.as_str())
            .bind(paid_at.as_datetime())
            .bind(gift.created_at.as_datetime())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error("mark gift code paid"))?;

        Gift::try_from(row)
    }

    async fn redeem_and_grant(
        &self,
        code: &GiftCode,
        recipient: &UserId,
        grant: PremiumGrant,
    ) -> Result<RedeemOutcome, DomainError> {
        let now = Timestamp::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(database_error("begin transaction"))?;

        let lock_gift = format!("SELECT {} FROM gift_codes WHERE code = $1 FOR UPDATE", GIFT_COLUMNS);
        let row: Option<GiftRow> = sqlx::query_as(&lock_gift)
            .bind(code.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(database_error("lock gift code"))?;

        let Some(row) = row else {
            return Ok(RedeemOutcome::Rejected(RedeemRejection::UnknownCode));
        };
        let mut gift = Gift::try_from(row)?;
        if let Err(rejection) = gift.redeem(recipient, now) {
            return Ok(RedeemOutcome::Rejected(rejection));
        }

        let exists: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM users WHERE user_id = $1 FOR UPDATE")
                .bind(recipient.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(database_error("lock recipient"))?;
        if exists.is_none() {
            return Err(user_not_found(recipient));
        }

        sqlx::query(
            "UPDATE gift_codes SET is_redeemed = TRUE, redeemed_by = $2, redeemed_at = $3 WHERE code = $1",
        )
        .bind(code.as_str())
        .bind(recipient.as_str())
        .bind(now.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(database_error("mark gift redeemed"))?;

        let (is_premium, until) = grant.resolve(now);
        let grant_sql = format!(
            "UPDATE users SET is_premium = $2, premium_until = $3 WHERE user_id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user_row: UserRow = sqlx::query_as(&grant_sql)
            .bind(recipient.as_str())
            .bind(is_premium)
            .bind(until.map(|t| *t.as_datetime()))
            .fetch_one(&mut *tx)
            .await
            .map_err(database_error("grant premium"))?;
        let entitlement = Entitlement::try_from(user_row)?;

        tx.commit()
            .await
            .map_err(database_error("commit transaction"))?;

        Ok(RedeemOutcome::Redeemed { gift, entitlement })
    }

    async fn list_by_sender(&self, sender: &UserId) -> Result<Vec<Gift>, DomainError> {
        let sql = format!(
            "SELECT {} FROM gift_codes WHERE sender_id = $1 ORDER BY created_at DESC",
            GIFT_COLUMNS
        );
        let rows: Vec<GiftRow> = sqlx::query_as(&sql)
            .bind(sender.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("list gift codes"))?;

        rows.into_iter().map(Gift::try_from).collect()
    }
}
