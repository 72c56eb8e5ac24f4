//! HandlePaymentNotificationHandler - Reconciles gateway callbacks.
//!
//! Gateway notifications arrive at least once, possibly out of order and
//! possibly before the checkout wrote its payment row. Each delivery is
//! reconciled against the payment ledger:
//!
//! 1. Parse the envelope; unknown event types are acknowledged and ignored
//! 2. Find the payment, creating it from notification metadata when unseen
//! 3. Stop if the stored status is already terminal (duplicate delivery)
//! 4. On success, apply the entitlement effects for the payment kind
//! 5. Move the stored status forward with a single compare-and-set
//! 6. Notify the user only when this delivery performed the transition
//!
//! Effects are applied before the status write. A failure while applying
//! them leaves the payment non-terminal, so the gateway's redelivery retries
//! the whole reconciliation. Every effect is safe to repeat: grants resolve
//! to `now + days` rather than adding up, and activating a gift code is
//! idempotent.

use std::sync::Arc;

use crate::domain::billing::{
    render_gift_link, BillingError, BillingNotification, Gift, ParsedNotification, PaymentKind,
    PaymentNotification, PaymentRecord, PaymentStatus, PremiumGrant, StatusChange,
};
use crate::domain::foundation::{PaymentId, Timestamp, UserId};
use crate::ports::{
    notify_best_effort, EntitlementStore, GiftLedger, Notifier, PaymentLedger, SaveResult,
};

/// Raw notification body as received over HTTP.
#[derive(Debug, Clone)]
pub struct HandlePaymentNotificationCommand {
    pub body: Vec<u8>,
}

/// What reconciliation did with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Well-formed event of a type that is not reconciled.
    Ignored { event: String },
    /// Payment was already terminal; nothing changed.
    Duplicate {
        payment_id: PaymentId,
        status: PaymentStatus,
    },
    /// Payment recorded, but its user is absent from the entitlement store.
    UnknownUser {
        payment_id: PaymentId,
        user_id: UserId,
    },
    /// Reconciled against the ledger.
    Applied {
        payment_id: PaymentId,
        status: PaymentStatus,
        change: StatusChange,
    },
}

/// Handler for gateway payment notifications.
pub struct HandlePaymentNotificationHandler {
    entitlements: Arc<dyn EntitlementStore>,
    payments: Arc<dyn PaymentLedger>,
    gifts: Arc<dyn GiftLedger>,
    notifier: Arc<dyn Notifier>,
    gift_link_template: Option<String>,
}

impl HandlePaymentNotificationHandler {
    pub fn new(
        entitlements: Arc<dyn EntitlementStore>,
        payments: Arc<dyn PaymentLedger>,
        gifts: Arc<dyn GiftLedger>,
        notifier: Arc<dyn Notifier>,
        gift_link_template: Option<String>,
    ) -> Self {
        Self {
            entitlements,
            payments,
            gifts,
            notifier,
            gift_link_template,
        }
    }

    /// Reconciles one delivery.
    ///
    /// # Errors
    ///
    /// - `MalformedEvent` when the body cannot be reconciled at all
    /// - `Infrastructure` when storage fails; the gateway should redeliver
    pub async fn handle(
        &self,
        cmd: HandlePaymentNotificationCommand,
    ) -> Result<NotificationOutcome, BillingError> {
        let notification = match PaymentNotification::parse(&cmd.body) {
            Ok(ParsedNotification::Payment(n)) => n,
            Ok(ParsedNotification::Ignored { event }) => {
                tracing::debug!(event = %event, "Ignoring payment notification");
                return Ok(NotificationOutcome::Ignored { event });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting malformed payment notification");
                return Err(e);
            }
        };

        let payment_id = notification.payment_id.clone();
        tracing::info!(
            payment_id = %payment_id,
            user_id = %notification.user_id,
            event = %notification.event,
            status = %notification.status,
            "Payment notification received"
        );

        let record = self.find_or_create(&notification).await?;

        if record.status.is_terminal() {
            tracing::info!(
                payment_id = %payment_id,
                stored = %record.status,
                reported = %notification.status,
                "Payment already settled, skipping"
            );
            return Ok(NotificationOutcome::Duplicate {
                payment_id,
                status: record.status,
            });
        }

        let user_id = record.user_id.clone();
        if self.entitlements.get(&user_id).await?.is_none() {
            tracing::warn!(
                payment_id = %payment_id,
                user_id = %user_id,
                "Payment references an unknown user, recording status only"
            );
            self.payments
                .update_status(&payment_id, notification.status)
                .await?;
            return Ok(NotificationOutcome::UnknownUser {
                payment_id,
                user_id,
            });
        }

        let message = match notification.status {
            PaymentStatus::Succeeded => Some(self.apply_success(&record, &notification).await?),
            PaymentStatus::WaitingForCapture => Some(BillingNotification::PaymentAuthorized),
            PaymentStatus::Canceled => Some(BillingNotification::PaymentCanceled),
            PaymentStatus::Pending => None,
        };

        let change = self
            .payments
            .update_status(&payment_id, notification.status)
            .await?;

        match change {
            StatusChange::Transitioned { from } => {
                tracing::info!(
                    payment_id = %payment_id,
                    from = %from,
                    to = %notification.status,
                    "Payment status updated"
                );
                if let Some(message) = message {
                    self.deliver(&user_id, message).await?;
                }
            }
            StatusChange::Unchanged => {
                tracing::debug!(payment_id = %payment_id, "Payment status unchanged");
            }
            StatusChange::Rejected { current } => {
                tracing::info!(
                    payment_id = %payment_id,
                    current = %current,
                    reported = %notification.status,
                    "Out-of-order status ignored"
                );
            }
        }

        Ok(NotificationOutcome::Applied {
            payment_id,
            status: notification.status,
            change,
        })
    }

    async fn find_or_create(
        &self,
        notification: &PaymentNotification,
    ) -> Result<PaymentRecord, BillingError> {
        if let Some(record) = self.payments.get(&notification.payment_id).await? {
            return Ok(record);
        }

        let record = notification.to_record(Timestamp::now());
        match self.payments.insert_if_absent(&record).await? {
            SaveResult::Inserted => {
                tracing::info!(
                    payment_id = %record.payment_id,
                    user_id = %record.user_id,
                    "Created payment record from notification"
                );
                Ok(record)
            }
            SaveResult::AlreadyExists(existing) => Ok(existing),
        }
    }

    /// Applies the effects of a successful payment and builds the payer's
    /// message. The stored kind wins over the notification's metadata.
    async fn apply_success(
        &self,
        record: &PaymentRecord,
        notification: &PaymentNotification,
    ) -> Result<BillingNotification, BillingError> {
        let user_id = &record.user_id;

        if let Some(instrument) = notification.saved_instrument() {
            self.entitlements
                .save_instrument(user_id, Some(instrument))
                .await?;
            tracing::info!(user_id = %user_id, "Saved payment method for renewals");
        }

        let policy = record.kind.policy();
        match record.kind {
            PaymentKind::Trial => {
                let entitlement = self
                    .entitlements
                    .set_premium(user_id, PremiumGrant::Days(policy.grant_days))
                    .await?;
                self.entitlements.set_trial_used(user_id).await?;
                Ok(BillingNotification::PaymentSucceeded {
                    kind: record.kind,
                    premium_until: entitlement.premium_until,
                })
            }
            PaymentKind::Regular | PaymentKind::Recurring => {
                let entitlement = self
                    .entitlements
                    .set_premium(user_id, PremiumGrant::Days(policy.grant_days))
                    .await?;
                Ok(BillingNotification::PaymentSucceeded {
                    kind: record.kind,
                    premium_until: entitlement.premium_until,
                })
            }
            PaymentKind::Gift => {
                let Some(code) = notification.gift_code.clone() else {
                    tracing::error!(
                        payment_id = %record.payment_id,
                        user_id = %user_id,
                        "Gift payment succeeded without a gift code, nothing to activate"
                    );
                    return Ok(BillingNotification::GiftCodeMissing);
                };

                let now = Timestamp::now();
                let gift = self
                    .gifts
                    .mark_paid(&Gift::issue(code.clone(), user_id.clone(), now).paid(now))
                    .await?;
                tracing::info!(
                    payment_id = %record.payment_id,
                    sender_id = %gift.sender_id,
                    "Gift code activated"
                );

                let link = match &self.gift_link_template {
                    Some(template) => Some(render_gift_link(template, &code)),
                    None => {
                        tracing::warn!(
                            payment_id = %record.payment_id,
                            "Gift link template not configured"
                        );
                        None
                    }
                };
                Ok(BillingNotification::GiftPurchased { link })
            }
        }
    }

    async fn deliver(
        &self,
        user_id: &UserId,
        message: BillingNotification,
    ) -> Result<(), BillingError> {
        if message == BillingNotification::PaymentCanceled
            && self.entitlements.is_currently_premium(user_id).await?
        {
            tracing::info!(
                user_id = %user_id,
                "Cancellation notice suppressed, user still premium"
            );
            return Ok(());
        }
        notify_best_effort(self.notifier.as_ref(), user_id, message).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Fixture;
    use crate::domain::billing::Amount;
    use crate::domain::foundation::GiftCode;
    use serde_json::{json, Value};

    const LINK_TEMPLATE: &str = "https://t.me/premium_bot?start=gift_{gift_code}";

    fn handler(fx: &Fixture) -> HandlePaymentNotificationHandler {
        HandlePaymentNotificationHandler::new(
            fx.entitlements(),
            fx.payments(),
            fx.gifts(),
            fx.notifier(),
            Some(LINK_TEMPLATE.to_string()),
        )
    }

    fn envelope(payment_id: &str, status: &str, user_id: &str, payment_type: &str) -> Value {
        json!({
            "event": format!("payment.{}", status),
            "object": {
                "id": payment_id,
                "status": status,
                "amount": { "value": "250.00", "currency": "RUB" },
                "metadata": { "user_id": user_id, "payment_type": payment_type }
            }
        })
    }

    fn command(value: &Value) -> HandlePaymentNotificationCommand {
        HandlePaymentNotificationCommand {
            body: serde_json::to_vec(value).unwrap(),
        }
    }

    async fn seed_pending(fx: &Fixture, payment_id: &str, user_id: &UserId, kind: PaymentKind) {
        let policy = kind.policy();
        fx.store
            .insert_if_absent(&PaymentRecord {
                payment_id: PaymentId::new(payment_id).unwrap(),
                user_id: user_id.clone(),
                kind,
                amount: policy.amount,
                currency: "RUB".to_string(),
                status: PaymentStatus::Pending,
                is_recurring: policy.is_recurring,
                description: policy.description.to_string(),
                instrument_ref: None,
                created_at: Timestamp::now(),
            })
            .await
            .unwrap();
    }

    async fn stored_status(fx: &Fixture, payment_id: &str) -> PaymentStatus {
        PaymentLedger::get(&fx.store, &PaymentId::new(payment_id).unwrap())
            .await
            .unwrap()
            .unwrap()
            .status
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success effects
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn trial_success_grants_three_days_and_consumes_trial() {
        let fx = Fixture::new();
        let user = fx.user("42").await;
        seed_pending(&fx, "pay-1", &user, PaymentKind::Trial).await;

        let outcome = handler(&fx)
            .handle(command(&envelope("pay-1", "succeeded", "42", "trial")))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            NotificationOutcome::Applied {
                change: StatusChange::Transitioned { from: PaymentStatus::Pending },
                ..
            }
        ));
        let e = fx.entitlement(&user).await;
        assert!(e.is_premium);
        assert!(e.trial_used);
        let until = e.premium_until.unwrap();
        assert!(until.is_after(&Timestamp::now().add_days(2)));
        assert!(until.is_before(&Timestamp::now().add_days(4)));
        assert_eq!(stored_status(&fx, "pay-1").await, PaymentStatus::Succeeded);
        assert_eq!(fx.notifier.count_of("payment_succeeded"), 1);
    }

    #[tokio::test]
    async fn regular_success_saves_instrument_and_grants_thirty_days() {
        let fx = Fixture::new();
        let user = fx.user("42").await;
        seed_pending(&fx, "pay-1", &user, PaymentKind::Regular).await;

        let mut body = envelope("pay-1", "succeeded", "42", "regular");
        body["object"]["payment_method"] = json!({ "id": "pm-7", "saved": true });
        handler(&fx).handle(command(&body)).await.unwrap();

        let e = fx.entitlement(&user).await;
        assert!(e.is_premium);
        assert!(!e.trial_used);
        assert_eq!(e.instrument_ref.as_deref(), Some("pm-7"));
        assert!(e.premium_until.unwrap().is_after(&Timestamp::now().add_days(29)));
    }

    #[tokio::test]
    async fn unsaved_instrument_is_not_stored() {
        let fx = Fixture::new();
        let user = fx.user("42").await;

        let mut body = envelope("pay-1", "succeeded", "42", "regular");
        body["object"]["payment_method"] = json!({ "id": "pm-7", "saved": false });
        handler(&fx).handle(command(&body)).await.unwrap();

        assert_eq!(fx.entitlement(&user).await.instrument_ref, None);
    }

    #[tokio::test]
    async fn gift_success_issues_code_and_sends_link_to_payer_only() {
        let fx = Fixture::new();
        let payer = fx.user("42").await;
        seed_pending(&fx, "pay-1", &payer, PaymentKind::Gift).await;

        let mut body = envelope("pay-1", "succeeded", "42", "gift");
        body["object"]["metadata"]["gift_code"] = json!("abc123");
        handler(&fx).handle(command(&body)).await.unwrap();

        let code = GiftCode::parse("abc123").unwrap();
        let gift = GiftLedger::get(&fx.store, &code).await.unwrap().unwrap();
        assert_eq!(gift.sender_id, payer);
        assert!(gift.is_paid);
        assert!(!gift.is_redeemed);

        assert!(!fx.entitlement(&payer).await.is_premium);
        let sent = fx.notifier.sent_to(&payer);
        assert_eq!(
            sent,
            vec![BillingNotification::GiftPurchased {
                link: Some("https://t.me/premium_bot?start=gift_abc123".to_string())
            }]
        );
    }

    #[tokio::test]
    async fn gift_success_without_template_sends_fallback_message() {
        let fx = Fixture::new();
        let payer = fx.user("42").await;
        let handler = HandlePaymentNotificationHandler::new(
            fx.entitlements(),
            fx.payments(),
            fx.gifts(),
            fx.notifier(),
            None,
        );

        let mut body = envelope("pay-1", "succeeded", "42", "gift");
        body["object"]["metadata"]["gift_code"] = json!("abc123");
        handler.handle(command(&body)).await.unwrap();

        assert_eq!(
            fx.notifier.sent_to(&payer),
            vec![BillingNotification::GiftPurchased { link: None }]
        );
    }

    #[tokio::test]
    async fn gift_success_activates_code_reserved_at_checkout() {
        let fx = Fixture::new();
        let payer = fx.user("42").await;
        seed_pending(&fx, "pay-1", &payer, PaymentKind::Gift).await;
        let code = GiftCode::parse("abc123").unwrap();
        let reserved_at = Timestamp::now().minus_hours(1);
        fx.store
            .create(&Gift::issue(code.clone(), payer.clone(), reserved_at))
            .await
            .unwrap();

        let mut body = envelope("pay-1", "succeeded", "42", "gift");
        body["object"]["metadata"]["gift_code"] = json!("abc123");
        handler(&fx).handle(command(&body)).await.unwrap();

        let gift = GiftLedger::get(&fx.store, &code).await.unwrap().unwrap();
        assert!(gift.is_paid);
        assert!(gift.paid_at.is_some());
        assert_eq!(gift.created_at, reserved_at);
    }

    #[tokio::test]
    async fn canceled_gift_payment_leaves_code_unpaid() {
        let fx = Fixture::new();
        let payer = fx.user("42").await;
        seed_pending(&fx, "pay-1", &payer, PaymentKind::Gift).await;
        let code = GiftCode::parse("abc123").unwrap();
        fx.store
            .create(&Gift::issue(code.clone(), payer.clone(), Timestamp::now()))
            .await
            .unwrap();

        let mut body = envelope("pay-1", "canceled", "42", "gift");
        body["object"]["metadata"]["gift_code"] = json!("abc123");
        handler(&fx).handle(command(&body)).await.unwrap();

        let gift = GiftLedger::get(&fx.store, &code).await.unwrap().unwrap();
        assert!(!gift.is_paid);
        assert_eq!(stored_status(&fx, "pay-1").await, PaymentStatus::Canceled);
    }

    #[tokio::test]
    async fn gift_success_without_code_tells_payer_to_contact_support() {
        let fx = Fixture::new();
        let payer = fx.user("42").await;
        seed_pending(&fx, "pay-1", &payer, PaymentKind::Gift).await;

        handler(&fx)
            .handle(command(&envelope("pay-1", "succeeded", "42", "gift")))
            .await
            .unwrap();

        assert_eq!(
            fx.notifier.sent_to(&payer),
            vec![BillingNotification::GiftCodeMissing]
        );
        assert!(fx.store.list_by_sender(&payer).await.unwrap().is_empty());
        assert_eq!(stored_status(&fx, "pay-1").await, PaymentStatus::Succeeded);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Delivery semantics
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_delivery_changes_nothing() {
        let fx = Fixture::new();
        let user = fx.user("42").await;
        seed_pending(&fx, "pay-1", &user, PaymentKind::Regular).await;
        let body = envelope("pay-1", "succeeded", "42", "regular");

        handler(&fx).handle(command(&body)).await.unwrap();
        let after_first = fx.entitlement(&user).await;

        let outcome = handler(&fx).handle(command(&body)).await.unwrap();

        assert!(matches!(outcome, NotificationOutcome::Duplicate { .. }));
        assert_eq!(fx.entitlement(&user).await.premium_until, after_first.premium_until);
        assert_eq!(fx.notifier.count_of("payment_succeeded"), 1);
    }

    #[tokio::test]
    async fn unseen_payment_is_created_from_metadata() {
        let fx = Fixture::new();
        let user = fx.user("42").await;

        let mut body = envelope("pay-new", "succeeded", "42", "recurring");
        body["object"]["amount"] = json!({ "value": "199.00", "currency": "RUB" });
        body["object"]["payment_method"] = json!({ "id": "pm-1", "saved": true });
        handler(&fx).handle(command(&body)).await.unwrap();

        let record = PaymentLedger::get(&fx.store, &PaymentId::new("pay-new").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, PaymentStatus::Succeeded);
        assert_eq!(record.amount, Amount::from_minor(19_900));
        assert!(record.is_recurring);
        assert_eq!(record.instrument_ref.as_deref(), Some("pm-1"));
        assert!(fx.entitlement(&user).await.is_premium);
    }

    #[tokio::test]
    async fn late_cancel_does_not_reverse_success() {
        let fx = Fixture::new();
        let user = fx.user("42").await;
        seed_pending(&fx, "pay-1", &user, PaymentKind::Regular).await;

        handler(&fx)
            .handle(command(&envelope("pay-1", "succeeded", "42", "regular")))
            .await
            .unwrap();
        let outcome = handler(&fx)
            .handle(command(&envelope("pay-1", "canceled", "42", "regular")))
            .await
            .unwrap();

        assert!(matches!(outcome, NotificationOutcome::Duplicate { .. }));
        assert_eq!(stored_status(&fx, "pay-1").await, PaymentStatus::Succeeded);
        assert!(fx.entitlement(&user).await.is_premium);
        assert_eq!(fx.notifier.count_of("payment_canceled"), 0);
    }

    #[tokio::test]
    async fn waiting_for_capture_notifies_authorization_without_grant() {
        let fx = Fixture::new();
        let user = fx.user("42").await;
        seed_pending(&fx, "pay-1", &user, PaymentKind::Regular).await;

        handler(&fx)
            .handle(command(&envelope("pay-1", "waiting_for_capture", "42", "regular")))
            .await
            .unwrap();

        assert_eq!(stored_status(&fx, "pay-1").await, PaymentStatus::WaitingForCapture);
        assert!(!fx.entitlement(&user).await.is_premium);
        assert_eq!(fx.notifier.count_of("payment_authorized"), 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Cancellation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn cancel_notifies_non_premium_user() {
        let fx = Fixture::new();
        let user = fx.user("42").await;
        seed_pending(&fx, "pay-1", &user, PaymentKind::Regular).await;

        handler(&fx)
            .handle(command(&envelope("pay-1", "canceled", "42", "regular")))
            .await
            .unwrap();

        assert_eq!(stored_status(&fx, "pay-1").await, PaymentStatus::Canceled);
        assert_eq!(fx.notifier.count_of("payment_canceled"), 1);
    }

    #[tokio::test]
    async fn cancel_is_silent_for_user_still_premium() {
        let fx = Fixture::new();
        let user = fx.user("42").await;
        fx.store.set_premium(&user, PremiumGrant::Days(10)).await.unwrap();
        seed_pending(&fx, "pay-1", &user, PaymentKind::Regular).await;

        handler(&fx)
            .handle(command(&envelope("pay-1", "canceled", "42", "regular")))
            .await
            .unwrap();

        assert_eq!(stored_status(&fx, "pay-1").await, PaymentStatus::Canceled);
        assert!(fx.notifier.sent().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejections and warnings
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn malformed_body_is_rejected_without_state_change() {
        let fx = Fixture::new();
        fx.user("42").await;

        let err = handler(&fx)
            .handle(HandlePaymentNotificationCommand {
                body: b"not json".to_vec(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::MalformedEvent(_)));

        let mut missing_user = envelope("pay-1", "succeeded", "42", "regular");
        missing_user["object"]["metadata"] = json!({ "payment_type": "regular" });
        let err = handler(&fx).handle(command(&missing_user)).await.unwrap_err();
        assert!(matches!(err, BillingError::MalformedEvent(_)));

        assert_eq!(fx.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn unhandled_event_type_is_ignored() {
        let fx = Fixture::new();
        let outcome = handler(&fx)
            .handle(command(&json!({ "event": "refund.succeeded", "object": {} })))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            NotificationOutcome::Ignored {
                event: "refund.succeeded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unknown_user_payment_is_still_recorded() {
        let fx = Fixture::new();

        let outcome = handler(&fx)
            .handle(command(&envelope("pay-1", "succeeded", "404", "regular")))
            .await
            .unwrap();

        assert!(matches!(outcome, NotificationOutcome::UnknownUser { .. }));
        assert_eq!(stored_status(&fx, "pay-1").await, PaymentStatus::Succeeded);
        assert!(fx.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_reconciliation() {
        let fx = Fixture::new();
        let user = fx.user("42").await;
        fx.notifier.fail_deliveries(true);

        let outcome = handler(&fx)
            .handle(command(&envelope("pay-1", "succeeded", "42", "regular")))
            .await
            .unwrap();

        assert!(matches!(outcome, NotificationOutcome::Applied { .. }));
        assert!(fx.entitlement(&user).await.is_premium);
    }
}
