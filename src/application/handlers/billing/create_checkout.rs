//! CreateCheckoutHandler - Command handler for user-initiated checkouts.
//!
//! One parameterized path for every checkout kind; pricing and behavior come
//! from the `PaymentKind` policy table.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::billing::{Amount, BillingError, PaymentKind, PaymentRecord, PaymentStatus};
use crate::domain::foundation::{GiftCode, PaymentId, Timestamp, UserId};
use crate::ports::{CreatePaymentRequest, EntitlementStore, PaymentGateway, PaymentLedger};

/// Command to start a checkout.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub user_id: UserId,
    /// Requested kind; a trial falls back to regular once used.
    pub kind: PaymentKind,
    /// Required for gift checkouts.
    pub gift_code: Option<GiftCode>,
}

/// Result of a started checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutResult {
    pub payment_id: PaymentId,
    /// Kind actually charged.
    pub kind: PaymentKind,
    pub amount: Amount,
    pub currency: String,
    /// Where to send the user's browser.
    pub redirect_url: Option<String>,
}

/// Handler for creating redirect checkouts.
///
/// The payment row is written before returning so a later notification has
/// something to reconcile against. A failed write is logged, not surfaced:
/// the reconciler creates missing rows from notification metadata.
pub struct CreateCheckoutHandler {
    entitlements: Arc<dyn EntitlementStore>,
    payments: Arc<dyn PaymentLedger>,
    gateway: Arc<dyn PaymentGateway>,
    return_url: Option<String>,
}

impl CreateCheckoutHandler {
    pub fn new(
        entitlements: Arc<dyn EntitlementStore>,
        payments: Arc<dyn PaymentLedger>,
        gateway: Arc<dyn PaymentGateway>,
        return_url: Option<String>,
    ) -> Self {
        Self {
            entitlements,
            payments,
            gateway,
            return_url,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, BillingError> {
        // 1. Recurring charges are off-session and scheduler-initiated
        if cmd.kind == PaymentKind::Recurring {
            return Err(BillingError::validation(
                "kind",
                "recurring charges cannot be started by a checkout",
            ));
        }
        if cmd.kind == PaymentKind::Gift && cmd.gift_code.is_none() {
            return Err(BillingError::validation(
                "gift_code",
                "gift checkouts need a gift code",
            ));
        }

        // 2. Resolve the kind actually charged
        let entitlement = self
            .entitlements
            .get(&cmd.user_id)
            .await?
            .ok_or_else(|| BillingError::UnknownUser(cmd.user_id.clone()))?;
        let kind = cmd.kind.effective(entitlement.trial_used);
        if kind != cmd.kind {
            tracing::info!(user_id = %cmd.user_id, "Trial already used, charging regular price");
        }
        let policy = kind.policy();

        // 3. Create the payment at the gateway
        let request = CreatePaymentRequest {
            user_id: cmd.user_id.clone(),
            kind,
            amount: policy.amount,
            currency: policy.currency.to_string(),
            description: policy.description.to_string(),
            gift_code: cmd.gift_code.filter(|_| kind == PaymentKind::Gift),
            save_instrument: policy.save_instrument,
            instrument_ref: None,
            return_url: self.return_url.clone(),
            idempotency_key: Uuid::new_v4().simple().to_string(),
        };
        let payment = self.gateway.create_payment(request).await.map_err(|e| {
            tracing::warn!(
                user_id = %cmd.user_id,
                payment_type = kind.as_str(),
                error = %e,
                "Checkout creation failed"
            );
            BillingError::from(e)
        })?;

        // 4. Record the attempt
        let record = PaymentRecord {
            payment_id: payment.id.clone(),
            user_id: cmd.user_id.clone(),
            kind,
            amount: payment.amount,
            currency: payment.currency.clone(),
            status: PaymentStatus::Pending,
            is_recurring: policy.is_recurring,
            description: policy.description.to_string(),
            instrument_ref: None,
            created_at: Timestamp::now(),
        };
        if let Err(e) = self.payments.insert_if_absent(&record).await {
            tracing::warn!(
                payment_id = %payment.id,
                error = %e,
                "Failed to record checkout, notification will create it"
            );
        }

        tracing::info!(
            payment_id = %payment.id,
            user_id = %cmd.user_id,
            payment_type = kind.as_str(),
            "Checkout created"
        );

        Ok(CreateCheckoutResult {
            payment_id: payment.id,
            kind,
            amount: payment.amount,
            currency: payment.currency,
            redirect_url: payment.confirmation_url,
        })
    }
}
