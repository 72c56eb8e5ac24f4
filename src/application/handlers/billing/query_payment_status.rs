//! QueryPaymentStatusHandler - Query handler for a payment's gateway status.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PaymentStatus};
use crate::domain::foundation::PaymentId;
use crate::ports::{PaymentErrorCode, PaymentGateway, PaymentLedger};

#[derive(Debug, Clone)]
pub struct QueryPaymentStatusQuery {
    pub payment_id: PaymentId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPaymentStatusResult {
    pub payment_id: PaymentId,
    /// Status reported by the gateway.
    pub status: PaymentStatus,
    /// Status in the local ledger, if the payment is known.
    pub recorded_status: Option<PaymentStatus>,
}

/// Reads status from the gateway. Never changes entitlement; reconciliation
/// happens only through notifications.
pub struct QueryPaymentStatusHandler {
    payments: Arc<dyn PaymentLedger>,
    gateway: Arc<dyn PaymentGateway>,
}

impl QueryPaymentStatusHandler {
    pub fn new(payments: Arc<dyn PaymentLedger>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { payments, gateway }
    }

    pub async fn handle(
        &self,
        query: QueryPaymentStatusQuery,
    ) -> Result<QueryPaymentStatusResult, BillingError> {
        let payment = self
            .gateway
            .get_payment(&query.payment_id)
            .await
            .map_err(|e| match e.code {
                PaymentErrorCode::NotFound => BillingError::PaymentNotFound(query.payment_id.clone()),
                _ => BillingError::from(e),
            })?;

        let recorded_status = self
            .payments
            .get(&query.payment_id)
            .await?
            .map(|record| record.status);

        Ok(QueryPaymentStatusResult {
            payment_id: query.payment_id,
            status: payment.status,
            recorded_status,
        })
    }
}
