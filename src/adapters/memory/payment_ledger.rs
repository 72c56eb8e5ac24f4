use async_trait::async_trait;

use crate::domain::billing::{payment_not_found, PaymentRecord, PaymentStatus, StatusChange};
use crate::domain::foundation::{DomainError, PaymentId, UserId};
use crate::ports::{PaymentLedger, SaveResult};

use super::InMemoryBillingStore;

#[async_trait]
impl PaymentLedger for InMemoryBillingStore {
    async fn insert_if_absent(&self, record: &PaymentRecord) -> Result<SaveResult, DomainError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.payments.get(&record.payment_id) {
            return Ok(SaveResult::AlreadyExists(existing.clone()));
        }
        tables
            .payments
            .insert(record.payment_id.clone(), record.clone());
        Ok(SaveResult::Inserted)
    }

    async fn get(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self.tables.read().await.payments.get(payment_id).cloned())
    }

    async fn update_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
    ) -> Result<StatusChange, DomainError> {
        let mut tables = self.tables.write().await;
        let record = tables
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| payment_not_found(payment_id))?;
        let change = StatusChange::evaluate(record.status, status);
        if change.is_transition() {
            record.status = status;
        }
        Ok(change)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, DomainError> {
        let tables = self.tables.read().await;
        let mut records: Vec<PaymentRecord> = tables
            .payments
            .values()
            .filter(|p| &p.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
