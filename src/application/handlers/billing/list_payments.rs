//! ListPaymentsHandler - Query handler for a user's payment history.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PaymentRecord};
use crate::domain::foundation::UserId;
use crate::ports::PaymentLedger;

#[derive(Debug, Clone)]
pub struct ListPaymentsQuery {
    pub user_id: UserId,
}

/// Payments, newest first.
#[derive(Debug, Clone)]
pub struct ListPaymentsResult {
    pub payments: Vec<PaymentRecord>,
}

pub struct ListPaymentsHandler {
    payments: Arc<dyn PaymentLedger>,
}

impl ListPaymentsHandler {
    pub fn new(payments: Arc<dyn PaymentLedger>) -> Self {
        Self { payments }
    }

    pub async fn handle(&self, query: ListPaymentsQuery) -> Result<ListPaymentsResult, BillingError> {
        let payments = self.payments.list_for_user(&query.user_id).await?;
        Ok(ListPaymentsResult { payments })
    }
}
