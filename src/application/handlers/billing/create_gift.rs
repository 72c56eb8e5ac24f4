//! CreateGiftHandler - Command handler for buying a gift subscription.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Gift, PaymentKind};
use crate::domain::foundation::{GiftCode, Timestamp, UserId};
use crate::ports::{EntitlementStore, GiftLedger};

use super::create_checkout::{CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult};

#[derive(Debug, Clone)]
pub struct CreateGiftCommand {
    pub sender_id: UserId,
}

#[derive(Debug, Clone)]
pub struct CreateGiftResult {
    /// Stored unredeemed; shared with the sender only once payment succeeds.
    pub gift_code: GiftCode,
    pub checkout: CreateCheckoutResult,
}

/// Handler for gift purchases.
///
/// Issues the code before checkout so the reconciler can mint the
/// redemption link as soon as the payment succeeds.
pub struct CreateGiftHandler {
    entitlements: Arc<dyn EntitlementStore>,
    gifts: Arc<dyn GiftLedger>,
    checkout: Arc<CreateCheckoutHandler>,
}

impl CreateGiftHandler {
    pub fn new(
        entitlements: Arc<dyn EntitlementStore>,
        gifts: Arc<dyn GiftLedger>,
        checkout: Arc<CreateCheckoutHandler>,
    ) -> Self {
        Self {
            entitlements,
            gifts,
            checkout,
        }
    }

    pub async fn handle(&self, cmd: CreateGiftCommand) -> Result<CreateGiftResult, BillingError> {
        if self.entitlements.get(&cmd.sender_id).await?.is_none() {
            return Err(BillingError::UnknownUser(cmd.sender_id));
        }

        let gift_code = GiftCode::generate();
        self.gifts
            .create(&Gift::issue(
                gift_code.clone(),
                cmd.sender_id.clone(),
                Timestamp::now(),
            ))
            .await?;

        let checkout = self
            .checkout
            .handle(CreateCheckoutCommand {
                user_id: cmd.sender_id.clone(),
                kind: PaymentKind::Gift,
                gift_code: Some(gift_code.clone()),
            })
            .await?;

        tracing::info!(
            sender_id = %cmd.sender_id,
            payment_id = %checkout.payment_id,
            "Gift checkout created"
        );

        Ok(CreateGiftResult {
            gift_code,
            checkout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Fixture;
    use crate::ports::PaymentError;

    fn handler(fx: &Fixture) -> CreateGiftHandler {
        let checkout = CreateCheckoutHandler::new(fx.entitlements(), fx.payments(), fx.gateway(), None);
        CreateGiftHandler::new(fx.entitlements(), fx.gifts(), Arc::new(checkout))
    }

    #[tokio::test]
    async fn gift_code_is_stored_and_sent_to_gateway() {
        let fx = Fixture::new();
        let sender = fx.user("sender").await;

        let result = handler(&fx)
            .handle(CreateGiftCommand { sender_id: sender.clone() })
            .await
            .unwrap();

        let gift = GiftLedger::get(&fx.store, &result.gift_code).await.unwrap().unwrap();
        assert_eq!(gift.sender_id, sender);
        assert!(!gift.is_paid);
        assert!(!gift.is_redeemed);
        assert_eq!(result.checkout.kind, PaymentKind::Gift);
        assert_eq!(
            fx.gateway.last_create_request().unwrap().gift_code,
            Some(result.gift_code)
        );
    }

    #[tokio::test]
    async fn gift_purchase_leaves_sender_entitlement_alone() {
        let fx = Fixture::new();
        let sender = fx.user("sender").await;

        handler(&fx)
            .handle(CreateGiftCommand { sender_id: sender.clone() })
            .await
            .unwrap();

        let e = fx.entitlement(&sender).await;
        assert!(!e.is_premium);
        assert!(!e.trial_used);
    }

    #[tokio::test]
    async fn gateway_failure_is_surfaced() {
        let fx = Fixture::new();
        let sender = fx.user("sender").await;
        fx.gateway.set_error(PaymentError::network("reset"));

        let err = handler(&fx)
            .handle(CreateGiftCommand { sender_id: sender })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Gateway { .. }));
    }

    #[tokio::test]
    async fn unknown_sender_is_rejected() {
        let fx = Fixture::new();
        let err = handler(&fx)
            .handle(CreateGiftCommand {
                sender_id: UserId::new("ghost").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::UnknownUser(_)));
    }
}
