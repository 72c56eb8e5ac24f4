//! PostgreSQL implementation of PaymentLedger.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::{payment_not_found, PaymentRecord, PaymentStatus, StatusChange};
use crate::domain::foundation::{DomainError, PaymentId, UserId};
use crate::ports::{PaymentLedger, SaveResult};

use super::rows::{database_error, parse_status, PaymentRow, PAYMENT_COLUMNS};

pub struct PostgresPaymentLedger {
    pool: PgPool,
}

impl PostgresPaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentLedger for PostgresPaymentLedger {
    async fn insert_if_absent(&self, record: &PaymentRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, user_id, kind, amount_minor, currency, status,
                is_recurring, description, instrument_ref, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (payment_id) DO NOTHING
            "#,
        )
        .bind(record.payment_id.as_str())
        .bind(record.user_id.as_str())
        .bind(record.kind.as_str())
        .bind(record.amount.minor_units())
        .bind(&record.currency)
        .bind(record.status.as_str())
        .bind(record.is_recurring)
        .bind(&record.description)
        .bind(record.instrument_ref.as_deref())
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(database_error("insert payment"))?;

        if result.rows_affected() == 1 {
            return Ok(SaveResult::Inserted);
        }

        match self.get(&record.payment_id).await? {
            Some(existing) => Ok(SaveResult::AlreadyExists(existing)),
            None => Err(payment_not_found(&record.payment_id)),
        }
    }

    async fn get(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError> {
        let sql = format!("SELECT {} FROM payments WHERE payment_id = $1", PAYMENT_COLUMNS);
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(payment_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error("fetch payment"))?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn update_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
    ) -> Result<StatusChange, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(database_error("begin transaction"))?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM payments WHERE payment_id = $1 FOR UPDATE")
                .bind(payment_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(database_error("lock payment"))?;

        let Some(current) = current else {
            return Err(payment_not_found(payment_id));
        };
        let change = StatusChange::evaluate(parse_status(&current)?, status);

        if change.is_transition() {
            sqlx::query("UPDATE payments SET status = $2 WHERE payment_id = $1")
                .bind(payment_id.as_str())
                .bind(status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(database_error("update payment status"))?;
        }

        tx.commit()
            .await
            .map_err(database_error("commit transaction"))?;

        Ok(change)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, DomainError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        );
        let rows: Vec<PaymentRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("list payments"))?;

        rows.into_iter().map(PaymentRecord::try_from).collect()
    }
}
