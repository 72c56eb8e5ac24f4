//! RedeemGiftHandler - Command handler for redeeming a gift code.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, BillingNotification, PaymentKind, PremiumGrant, RedeemRejection, UserProfile,
};
use crate::domain::foundation::{GiftCode, Timestamp, UserId};
use crate::ports::{notify_best_effort, EntitlementStore, GiftLedger, Notifier, RedeemOutcome};

#[derive(Debug, Clone)]
pub struct RedeemGiftCommand {
    pub code: GiftCode,
    pub recipient_id: UserId,
    /// Profile to register the recipient with on first contact.
    pub profile: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemGiftResult {
    Redeemed { premium_until: Option<Timestamp> },
    Rejected(RedeemRejection),
}

/// Redeems a gift for its recipient.
///
/// The redeemed flag and the recipient's grant are written together by the
/// gift ledger, so two concurrent redeemers of one code yield one winner.
pub struct RedeemGiftHandler {
    entitlements: Arc<dyn EntitlementStore>,
    gifts: Arc<dyn GiftLedger>,
    notifier: Arc<dyn Notifier>,
}

impl RedeemGiftHandler {
    pub fn new(
        entitlements: Arc<dyn EntitlementStore>,
        gifts: Arc<dyn GiftLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            entitlements,
            gifts,
            notifier,
        }
    }

    pub async fn handle(&self, cmd: RedeemGiftCommand) -> Result<RedeemGiftResult, BillingError> {
        // Recipients may arrive through the gift link before any other contact
        self.entitlements
            .upsert_new_user(&cmd.recipient_id, &cmd.profile)
            .await?;

        let grant = PremiumGrant::Days(PaymentKind::Gift.policy().grant_days);
        let outcome = self
            .gifts
            .redeem_and_grant(&cmd.code, &cmd.recipient_id, grant)
            .await?;

        match outcome {
            RedeemOutcome::Redeemed { gift, entitlement } => {
                tracing::info!(
                    recipient_id = %cmd.recipient_id,
                    sender_id = %gift.sender_id,
                    "Gift redeemed"
                );
                notify_best_effort(
                    self.notifier.as_ref(),
                    &cmd.recipient_id,
                    BillingNotification::GiftRedeemed {
                        premium_until: entitlement.premium_until,
                    },
                )
                .await;
                Ok(RedeemGiftResult::Redeemed {
                    premium_until: entitlement.premium_until,
                })
            }
            RedeemOutcome::Rejected(reason) => {
                tracing::info!(
                    recipient_id = %cmd.recipient_id,
                    reason = ?reason,
                    "Gift redemption rejected"
                );
                Ok(RedeemGiftResult::Rejected(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Fixture;
    use crate::domain::billing::Gift;

    async fn reserve(fx: &Fixture, sender: &UserId) -> GiftCode {
        let code = GiftCode::generate();
        fx.store
            .create(&Gift::issue(code.clone(), sender.clone(), Timestamp::now()))
            .await
            .unwrap();
        code
    }

    async fn issue(fx: &Fixture, sender: &UserId) -> GiftCode {
        let code = reserve(fx, sender).await;
        let now = Timestamp::now();
        fx.store
            .mark_paid(&Gift::issue(code.clone(), sender.clone(), now).paid(now))
            .await
            .unwrap();
        code
    }

    fn handler(fx: &Fixture) -> RedeemGiftHandler {
        RedeemGiftHandler::new(fx.entitlements(), fx.gifts(), fx.notifier())
    }

    fn command(code: &GiftCode, recipient: &str) -> RedeemGiftCommand {
        RedeemGiftCommand {
            code: code.clone(),
            recipient_id: UserId::new(recipient).unwrap(),
            profile: UserProfile::default(),
        }
    }

    #[tokio::test]
    async fn new_recipient_is_registered_and_granted() {
        let fx = Fixture::new();
        let sender = fx.user("sender").await;
        let code = issue(&fx, &sender).await;

        let result = handler(&fx).handle(command(&code, "friend")).await.unwrap();

        assert!(matches!(result, RedeemGiftResult::Redeemed { premium_until: Some(_) }));
        let recipient = UserId::new("friend").unwrap();
        assert!(fx.entitlement(&recipient).await.is_premium);
        assert_eq!(fx.notifier.count_of("gift_redeemed"), 1);
    }

    #[tokio::test]
    async fn second_redemption_is_rejected() {
        let fx = Fixture::new();
        let sender = fx.user("sender").await;
        let code = issue(&fx, &sender).await;

        handler(&fx).handle(command(&code, "first")).await.unwrap();
        let result = handler(&fx).handle(command(&code, "second")).await.unwrap();

        assert_eq!(result, RedeemGiftResult::Rejected(RedeemRejection::AlreadyRedeemed));
        let second = UserId::new("second").unwrap();
        assert!(!fx.entitlement(&second).await.is_premium);
    }

    #[tokio::test]
    async fn sender_cannot_redeem_own_gift() {
        let fx = Fixture::new();
        let sender = fx.user("sender").await;
        let code = issue(&fx, &sender).await;

        let result = handler(&fx).handle(command(&code, "sender")).await.unwrap();

        assert_eq!(result, RedeemGiftResult::Rejected(RedeemRejection::SelfRedemption));
        assert!(!fx.entitlement(&sender).await.is_premium);
        let gift = GiftLedger::get(&fx.store, &code).await.unwrap().unwrap();
        assert!(!gift.is_redeemed);
    }

    #[tokio::test]
    async fn unpaid_code_is_rejected_and_grants_nothing() {
        let fx = Fixture::new();
        let sender = fx.user("sender").await;
        let code = reserve(&fx, &sender).await;

        let result = handler(&fx).handle(command(&code, "friend")).await.unwrap();

        assert_eq!(result, RedeemGiftResult::Rejected(RedeemRejection::NotPaid));
        let friend = UserId::new("friend").unwrap();
        assert!(!fx.entitlement(&friend).await.is_premium);
        let gift = GiftLedger::get(&fx.store, &code).await.unwrap().unwrap();
        assert!(!gift.is_redeemed);
        assert_eq!(fx.notifier.count_of("gift_redeemed"), 0);
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let fx = Fixture::new();
        let result = handler(&fx)
            .handle(command(&GiftCode::generate(), "friend"))
            .await
            .unwrap();

        assert_eq!(result, RedeemGiftResult::Rejected(RedeemRejection::UnknownCode));
        assert!(fx.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn concurrent_redeemers_yield_one_winner() {
        let fx = Fixture::new();
        let sender = fx.user("sender").await;
        let code = issue(&fx, &sender).await;
        let handler = Arc::new(handler(&fx));

        let mut tasks = Vec::new();
        for i in 0..8 {
            let handler = handler.clone();
            let cmd = command(&code, &format!("friend-{}", i));
            tasks.push(tokio::spawn(async move { handler.handle(cmd).await.unwrap() }));
        }

        let mut winners = 0;
        for task in tasks {
            if matches!(task.await.unwrap(), RedeemGiftResult::Redeemed { .. }) {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(fx.notifier.count_of("gift_redeemed"), 1);
    }
}
