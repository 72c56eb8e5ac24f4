//! Payment ledger port.
//!
//! Append-mostly record of every payment attempt, keyed by the gateway's
//! payment id. Rows are immutable except for `status`, which only moves
//! forward.

use crate::domain::billing::{PaymentRecord, PaymentStatus, StatusChange};
use crate::domain::foundation::{DomainError, PaymentId, UserId};
use async_trait::async_trait;

/// Result of inserting a payment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    /// New row written.
    Inserted,
    /// A row with this payment id already exists; it is returned unchanged.
    AlreadyExists(PaymentRecord),
}

/// Repository port for payment records.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Insert a record unless one exists for the same payment id.
    async fn insert_if_absent(&self, record: &PaymentRecord) -> Result<SaveResult, DomainError>;

    async fn get(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError>;

    /// Atomically move the status forward.
    ///
    /// Backward moves are refused and reported, not errors.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if no row exists
    async fn update_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
    ) -> Result<StatusChange, DomainError>;

    /// A user's payments, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, DomainError>;
}
