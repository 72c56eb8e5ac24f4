//! CreateRecurringChargeHandler - Off-session renewal charge.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::billing::{BillingError, PaymentKind, PaymentRecord, PaymentStatus};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{CreatePaymentRequest, GatewayPayment, PaymentGateway, PaymentLedger};

#[derive(Debug, Clone)]
pub struct CreateRecurringChargeCommand {
    pub user_id: UserId,
    pub instrument_ref: String,
}

#[derive(Debug, Clone)]
pub struct CreateRecurringChargeResult {
    pub payment: GatewayPayment,
}

/// Charges a saved payment method without user interaction.
///
/// The payment row is always written as pending; the caller moves it forward
/// through the ledger so concurrent reconciliation sees a single transition.
pub struct CreateRecurringChargeHandler {
    payments: Arc<dyn PaymentLedger>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CreateRecurringChargeHandler {
    pub fn new(payments: Arc<dyn PaymentLedger>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { payments, gateway }
    }

    pub async fn handle(
        &self,
        cmd: CreateRecurringChargeCommand,
    ) -> Result<CreateRecurringChargeResult, BillingError> {
        let policy = PaymentKind::Recurring.policy();

        let payment = self
            .gateway
            .create_payment(CreatePaymentRequest {
                user_id: cmd.user_id.clone(),
                kind: PaymentKind::Recurring,
                amount: policy.amount,
                currency: policy.currency.to_string(),
                description: policy.description.to_string(),
                gift_code: None,
                save_instrument: policy.save_instrument,
                instrument_ref: Some(cmd.instrument_ref.clone()),
                return_url: None,
                idempotency_key: Uuid::new_v4().simple().to_string(),
            })
            .await?;

        let record = PaymentRecord {
            payment_id: payment.id.clone(),
            user_id: cmd.user_id.clone(),
            kind: PaymentKind::Recurring,
            amount: payment.amount,
            currency: payment.currency.clone(),
            status: PaymentStatus::Pending,
            is_recurring: true,
            description: policy.description.to_string(),
            instrument_ref: Some(cmd.instrument_ref),
            created_at: Timestamp::now(),
        };
        if let Err(e) = self.payments.insert_if_absent(&record).await {
            tracing::warn!(
                payment_id = %payment.id,
                user_id = %cmd.user_id,
                error = %e,
                "Failed to record recurring charge"
            );
        }

        tracing::info!(
            payment_id = %payment.id,
            user_id = %cmd.user_id,
            status = %payment.status,
            "Recurring charge created"
        );

        Ok(CreateRecurringChargeResult { payment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Fixture;
    use crate::ports::PaymentError;

    #[tokio::test]
    async fn charges_saved_instrument_without_redirect() {
        let fx = Fixture::new();
        fx.gateway.set_create_status(PaymentStatus::Succeeded);
        let handler = CreateRecurringChargeHandler::new(fx.payments(), fx.gateway());

        let result = handler
            .handle(CreateRecurringChargeCommand {
                user_id: UserId::new("1").unwrap(),
                instrument_ref: "pm-1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result.payment.status, PaymentStatus::Succeeded);
        let request = fx.gateway.last_create_request().unwrap();
        assert_eq!(request.kind, PaymentKind::Recurring);
        assert_eq!(request.instrument_ref.as_deref(), Some("pm-1"));
        assert!(request.return_url.is_none());

        let record = PaymentLedger::get(&fx.store, &result.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);
        assert!(record.is_recurring);
    }

    #[tokio::test]
    async fn gateway_error_becomes_billing_error() {
        let fx = Fixture::new();
        fx.gateway.set_error(PaymentError::authentication("revoked"));
        let handler = CreateRecurringChargeHandler::new(fx.payments(), fx.gateway());

        let err = handler
            .handle(CreateRecurringChargeCommand {
                user_id: UserId::new("1").unwrap(),
                instrument_ref: "pm-1".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Gateway { retryable: false, .. }));
    }
}
