//! RecurringBillingScheduler - Background service for automatic renewals.
//!
//! Periodically finds lapsed premium entitlements that still hold a saved
//! payment method and charges that method off-session.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 1h | Time between scans; the first scan runs one interval after start |
//! | `max_concurrency` | 4 | Charges in flight per scan |
//!
//! ## Per-user Outcomes
//!
//! - `succeeded` charge: premium extended 30 days, user notified once
//! - `canceled` charge: payment marked canceled; the failure notice is sent
//!   only if that write moved the status, since a notification may have
//!   settled it first
//! - Pending or errored charge: failure notice, unless the user is
//!   premium again by the time it is checked (a concurrent renewal won)
//!
//! Checking premium status expires the lapsed flag, so a user whose renewal
//! failed is not charged again on the next scan.
//!
//! ## Graceful Shutdown
//!
//! The service listens for a shutdown signal between scans. A scan that is
//! running completes before the loop exits; charges left pending are
//! reconciled later by gateway notifications.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::application::handlers::billing::{
    CreateRecurringChargeCommand, CreateRecurringChargeHandler,
};
use crate::domain::billing::{
    BillingNotification, PaymentKind, PaymentStatus, PremiumGrant, StatusChange,
};
use crate::domain::foundation::{DomainError, PaymentId, Timestamp, UserId};
use crate::ports::{notify_best_effort, EntitlementStore, Notifier, PaymentLedger};

/// Configuration for the RecurringBillingScheduler service.
#[derive(Debug, Clone)]
pub struct RecurringBillingConfig {
    /// Time between scans.
    pub interval: Duration,

    /// Maximum charges in flight during a scan.
    pub max_concurrency: usize,
}

impl Default for RecurringBillingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            max_concurrency: 4,
        }
    }
}

impl RecurringBillingConfig {
    /// Create config with custom scan interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Create config with custom fan-out.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }
}

/// Tally of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenewalReport {
    /// Users found due for renewal.
    pub due: usize,
    /// Charges that succeeded.
    pub renewed: usize,
    /// Charges declined or left pending; the user was told.
    pub failed: usize,
    /// Failures not reported because the user was premium again.
    pub suppressed: usize,
    /// Gateway or storage errors; the user was told.
    pub errors: usize,
}

impl RenewalReport {
    fn record(&mut self, outcome: RenewalOutcome) {
        match outcome {
            RenewalOutcome::Renewed => self.renewed += 1,
            RenewalOutcome::Failed => self.failed += 1,
            RenewalOutcome::Suppressed => self.suppressed += 1,
            RenewalOutcome::Errored => self.errors += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenewalOutcome {
    Renewed,
    Failed,
    Suppressed,
    Errored,
}

/// Background service that renews lapsed subscriptions.
pub struct RecurringBillingScheduler {
    entitlements: Arc<dyn EntitlementStore>,
    payments: Arc<dyn PaymentLedger>,
    charges: Arc<CreateRecurringChargeHandler>,
    notifier: Arc<dyn Notifier>,
    config: RecurringBillingConfig,
}

impl RecurringBillingScheduler {
    /// Create a new scheduler with default configuration.
    pub fn new(
        entitlements: Arc<dyn EntitlementStore>,
        payments: Arc<dyn PaymentLedger>,
        charges: Arc<CreateRecurringChargeHandler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_config(
            entitlements,
            payments,
            charges,
            notifier,
            RecurringBillingConfig::default(),
        )
    }

    /// Create a new scheduler with custom configuration.
    pub fn with_config(
        entitlements: Arc<dyn EntitlementStore>,
        payments: Arc<dyn PaymentLedger>,
        charges: Arc<CreateRecurringChargeHandler>,
        notifier: Arc<dyn Notifier>,
        config: RecurringBillingConfig,
    ) -> Self {
        Self {
            entitlements,
            payments,
            charges,
            notifier,
            config,
        }
    }

    /// Run the scan loop until shutdown signal is received.
    ///
    /// A failed scan is logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), DomainError> {
        let mut interval = time::interval_at(
            Instant::now() + self.config.interval,
            self.config.interval,
        );
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            max_concurrency = self.config.max_concurrency,
            "Recurring billing scheduler started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    // A dropped sender also means shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Recurring billing scheduler stopped");
                        return Ok(());
                    }
                }

                _ = interval.tick() => {
                    if let Err(e) = self.scan_once().await {
                        tracing::error!(error = %e, "Renewal scan failed");
                    }
                }
            }
        }
    }

    /// Run exactly one scan.
    pub async fn scan_once(&self) -> Result<RenewalReport, DomainError> {
        let due = self
            .entitlements
            .find_due_for_renewal(Timestamp::now())
            .await?;

        let mut report = RenewalReport {
            due: due.len(),
            ..RenewalReport::default()
        };
        if due.is_empty() {
            tracing::debug!("No subscriptions due for renewal");
            return Ok(report);
        }
        tracing::info!(due = report.due, "Renewing lapsed subscriptions");

        let outcomes: Vec<RenewalOutcome> = stream::iter(due.into_iter().filter_map(|e| {
            let instrument = e.instrument_ref?;
            Some((e.user_id, instrument))
        }))
        .map(|(user_id, instrument)| self.renew(user_id, instrument))
        .buffer_unordered(self.config.max_concurrency.max(1))
        .collect()
        .await;

        for outcome in outcomes {
            report.record(outcome);
        }

        tracing::info!(
            due = report.due,
            renewed = report.renewed,
            failed = report.failed,
            suppressed = report.suppressed,
            errors = report.errors,
            "Renewal scan finished"
        );
        Ok(report)
    }

    async fn renew(&self, user_id: UserId, instrument_ref: String) -> RenewalOutcome {
        let result = self
            .charges
            .handle(CreateRecurringChargeCommand {
                user_id: user_id.clone(),
                instrument_ref,
            })
            .await;

        match result {
            Ok(charge) if charge.payment.status == PaymentStatus::Succeeded => {
                match self.complete(&user_id, &charge.payment.id).await {
                    Ok(()) => RenewalOutcome::Renewed,
                    Err(e) => {
                        tracing::error!(
                            user_id = %user_id,
                            payment_id = %charge.payment.id,
                            error = %e,
                            "Charge succeeded but renewal was not applied"
                        );
                        RenewalOutcome::Errored
                    }
                }
            }
            Ok(charge) if charge.payment.status == PaymentStatus::Canceled => {
                tracing::info!(
                    user_id = %user_id,
                    payment_id = %charge.payment.id,
                    "Renewal charge declined"
                );
                self.decline(&user_id, &charge.payment.id).await
            }
            Ok(charge) => {
                tracing::info!(
                    user_id = %user_id,
                    payment_id = %charge.payment.id,
                    status = %charge.payment.status,
                    "Renewal charge did not succeed"
                );
                self.report_failure(&user_id, RenewalOutcome::Failed).await
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Renewal charge failed");
                self.report_failure(&user_id, RenewalOutcome::Errored).await
            }
        }
    }

    async fn complete(&self, user_id: &UserId, payment_id: &PaymentId) -> Result<(), DomainError> {
        let days = PaymentKind::Recurring.policy().grant_days;
        let entitlement = self
            .entitlements
            .set_premium(user_id, PremiumGrant::Days(days))
            .await?;
        let change = self
            .payments
            .update_status(payment_id, PaymentStatus::Succeeded)
            .await?;

        tracing::info!(user_id = %user_id, payment_id = %payment_id, "Subscription renewed");

        // A notification that already moved the payment has told the user
        if change.is_transition() {
            notify_best_effort(
                self.notifier.as_ref(),
                user_id,
                BillingNotification::SubscriptionRenewed {
                    premium_until: entitlement.premium_until,
                },
            )
            .await;
        }
        Ok(())
    }

    /// Records the decline in the ledger. Whoever moves the payment to
    /// canceled tells the user, so a `payment.canceled` notification for the
    /// same charge does not produce a second notice.
    async fn decline(&self, user_id: &UserId, payment_id: &PaymentId) -> RenewalOutcome {
        match self
            .payments
            .update_status(payment_id, PaymentStatus::Canceled)
            .await
        {
            Ok(StatusChange::Transitioned { .. }) => {
                self.report_failure(user_id, RenewalOutcome::Failed).await
            }
            Ok(StatusChange::Unchanged) => {
                tracing::info!(
                    user_id = %user_id,
                    payment_id = %payment_id,
                    "Decline already reconciled from a notification"
                );
                RenewalOutcome::Failed
            }
            Ok(StatusChange::Rejected { current }) => {
                tracing::warn!(
                    user_id = %user_id,
                    payment_id = %payment_id,
                    current = %current,
                    "Declined charge is already settled differently"
                );
                RenewalOutcome::Suppressed
            }
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    payment_id = %payment_id,
                    error = %e,
                    "Could not record declined charge"
                );
                self.report_failure(user_id, RenewalOutcome::Errored).await
            }
        }
    }

    async fn report_failure(&self, user_id: &UserId, outcome: RenewalOutcome) -> RenewalOutcome {
        match self.entitlements.is_currently_premium(user_id).await {
            Ok(true) => {
                tracing::info!(
                    user_id = %user_id,
                    "Renewed concurrently, suppressing failure notice"
                );
                RenewalOutcome::Suppressed
            }
            Ok(false) => {
                notify_best_effort(
                    self.notifier.as_ref(),
                    user_id,
                    BillingNotification::RenewalFailed,
                )
                .await;
                outcome
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Could not check premium status");
                RenewalOutcome::Errored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Fixture;
    use crate::domain::billing::PaymentRecord;
    use crate::ports::{CreatePaymentRequest, GatewayPayment, PaymentError, PaymentGateway};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scheduler(fx: &Fixture, gateway: Arc<dyn PaymentGateway>) -> RecurringBillingScheduler {
        let charges = Arc::new(CreateRecurringChargeHandler::new(fx.payments(), gateway));
        RecurringBillingScheduler::new(fx.entitlements(), fx.payments(), charges, fx.notifier())
    }

    /// Grants premium to the payer while the charge is in flight, as a
    /// concurrent manual payment would.
    struct RacingGateway {
        fx_store: Arc<dyn EntitlementStore>,
        inner: Arc<dyn PaymentGateway>,
    }

    #[async_trait]
    impl PaymentGateway for RacingGateway {
        async fn create_payment(
            &self,
            request: CreatePaymentRequest,
        ) -> Result<GatewayPayment, PaymentError> {
            self.fx_store
                .set_premium(&request.user_id, PremiumGrant::Days(30))
                .await
                .unwrap();
            self.inner.create_payment(request).await
        }

        async fn get_payment(&self, id: &PaymentId) -> Result<GatewayPayment, PaymentError> {
            self.inner.get_payment(id).await
        }
    }

    /// Writes the payment row and settles it with the gateway's status before
    /// returning, as a notification processed mid-charge would.
    struct SettlingGateway {
        payments: Arc<dyn PaymentLedger>,
        inner: Arc<dyn PaymentGateway>,
    }

    #[async_trait]
    impl PaymentGateway for SettlingGateway {
        async fn create_payment(
            &self,
            request: CreatePaymentRequest,
        ) -> Result<GatewayPayment, PaymentError> {
            let user_id = request.user_id.clone();
            let payment = self.inner.create_payment(request).await?;
            let policy = PaymentKind::Recurring.policy();
            self.payments
                .insert_if_absent(&PaymentRecord {
                    payment_id: payment.id.clone(),
                    user_id,
                    kind: PaymentKind::Recurring,
                    amount: payment.amount,
                    currency: payment.currency.clone(),
                    status: PaymentStatus::Pending,
                    is_recurring: true,
                    description: policy.description.to_string(),
                    instrument_ref: None,
                    created_at: Timestamp::now(),
                })
                .await
                .unwrap();
            self.payments
                .update_status(&payment.id, payment.status)
                .await
                .unwrap();
            Ok(payment)
        }

        async fn get_payment(&self, id: &PaymentId) -> Result<GatewayPayment, PaymentError> {
            self.inner.get_payment(id).await
        }
    }

    /// Tracks how many charges are in flight at once.
    struct SlowGateway {
        inner: Arc<dyn PaymentGateway>,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PaymentGateway for SlowGateway {
        async fn create_payment(
            &self,
            request: CreatePaymentRequest,
        ) -> Result<GatewayPayment, PaymentError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.inner.create_payment(request).await
        }

        async fn get_payment(&self, id: &PaymentId) -> Result<GatewayPayment, PaymentError> {
            self.inner.get_payment(id).await
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Scan outcomes
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn successful_charge_renews_and_notifies_once() {
        let fx = Fixture::new();
        let user = fx.lapsed_user("1", Some("pm-1")).await;
        fx.gateway.set_create_status(PaymentStatus::Succeeded);

        let report = scheduler(&fx, fx.gateway()).scan_once().await.unwrap();

        assert_eq!(report.due, 1);
        assert_eq!(report.renewed, 1);
        let e = fx.entitlement(&user).await;
        assert!(e.is_premium);
        assert!(e.premium_until.unwrap().is_after(&Timestamp::now().add_days(29)));
        assert_eq!(fx.notifier.count_of("subscription_renewed"), 1);

        let payments = fx.store.list_for_user(&user).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn declined_charge_notifies_once_and_is_not_retried() {
        let fx = Fixture::new();
        let user = fx.lapsed_user("1", Some("pm-1")).await;
        fx.gateway.set_create_status(PaymentStatus::Canceled);
        let scheduler = scheduler(&fx, fx.gateway());

        let report = scheduler.scan_once().await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(!fx.entitlement(&user).await.is_premium);

        let again = scheduler.scan_once().await.unwrap();
        assert_eq!(again.due, 0);
        assert_eq!(fx.notifier.count_of("renewal_failed"), 1);
        assert_eq!(fx.gateway.call_count("create_payment"), 1);
    }

    #[tokio::test]
    async fn declined_charge_is_recorded_as_canceled() {
        let fx = Fixture::new();
        let user = fx.lapsed_user("1", Some("pm-1")).await;
        fx.gateway.set_create_status(PaymentStatus::Canceled);

        scheduler(&fx, fx.gateway()).scan_once().await.unwrap();

        let payments = fx.store.list_for_user(&user).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Canceled);
    }

    #[tokio::test]
    async fn decline_settled_by_notification_first_is_not_notified_again() {
        let fx = Fixture::new();
        let user = fx.lapsed_user("1", Some("pm-1")).await;
        fx.gateway.set_create_status(PaymentStatus::Canceled);
        let gateway = Arc::new(SettlingGateway {
            payments: fx.payments(),
            inner: fx.gateway(),
        });

        let report = scheduler(&fx, gateway).scan_once().await.unwrap();

        assert_eq!(report.failed, 1);
        assert!(fx.notifier.sent_to(&user).is_empty());
    }

    #[tokio::test]
    async fn pending_charge_counts_as_failure() {
        let fx = Fixture::new();
        fx.lapsed_user("1", Some("pm-1")).await;

        let report = scheduler(&fx, fx.gateway()).scan_once().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(fx.notifier.count_of("renewal_failed"), 1);
    }

    #[tokio::test]
    async fn one_failing_user_does_not_stop_the_scan() {
        let fx = Fixture::new();
        fx.lapsed_user("1", Some("pm-1")).await;
        fx.lapsed_user("2", Some("pm-2")).await;
        fx.gateway.set_create_status(PaymentStatus::Succeeded);
        fx.gateway.set_error(PaymentError::network("reset"));

        let report = scheduler(&fx, fx.gateway()).scan_once().await.unwrap();

        assert_eq!(report.due, 2);
        assert_eq!(report.renewed, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(fx.notifier.count_of("renewal_failed"), 1);
    }

    #[tokio::test]
    async fn concurrent_renewal_suppresses_failure_notice() {
        let fx = Fixture::new();
        let user = fx.lapsed_user("1", Some("pm-1")).await;
        fx.gateway.set_create_status(PaymentStatus::Canceled);
        let gateway = Arc::new(RacingGateway {
            fx_store: fx.entitlements(),
            inner: fx.gateway(),
        });

        let report = scheduler(&fx, gateway).scan_once().await.unwrap();

        assert_eq!(report.suppressed, 1);
        assert!(fx.notifier.sent().is_empty());
        assert!(fx.entitlement(&user).await.is_premium);
    }

    #[tokio::test]
    async fn users_without_lapse_or_instrument_are_skipped() {
        let fx = Fixture::new();
        fx.lapsed_user("no-card", None).await;
        let active = fx.user("active").await;
        fx.store.set_premium(&active, PremiumGrant::Days(5)).await.unwrap();
        fx.store.save_instrument(&active, Some("pm-1")).await.unwrap();

        let report = scheduler(&fx, fx.gateway()).scan_once().await.unwrap();

        assert_eq!(report, RenewalReport::default());
        assert!(!fx.gateway.was_called("create_payment"));
    }

    #[tokio::test]
    async fn fan_out_respects_max_concurrency() {
        let fx = Fixture::new();
        for i in 0..6 {
            fx.lapsed_user(&format!("user-{}", i), Some("pm")).await;
        }
        fx.gateway.set_create_status(PaymentStatus::Succeeded);
        let gateway = Arc::new(SlowGateway {
            inner: fx.gateway(),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let charges = Arc::new(CreateRecurringChargeHandler::new(fx.payments(), gateway.clone()));
        let scheduler = RecurringBillingScheduler::with_config(
            fx.entitlements(),
            fx.payments(),
            charges,
            fx.notifier(),
            RecurringBillingConfig::default().with_max_concurrency(2),
        );

        let report = scheduler.scan_once().await.unwrap();

        assert_eq!(report.renewed, 6);
        assert!(gateway.peak.load(Ordering::SeqCst) <= 2);
        assert!(gateway.peak.load(Ordering::SeqCst) >= 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Run loop
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn run_scans_on_interval_and_stops_on_shutdown() {
        let fx = Fixture::new();
        fx.lapsed_user("1", Some("pm-1")).await;
        fx.gateway.set_create_status(PaymentStatus::Succeeded);
        let charges = Arc::new(CreateRecurringChargeHandler::new(fx.payments(), fx.gateway()));
        let scheduler = Arc::new(RecurringBillingScheduler::with_config(
            fx.entitlements(),
            fx.payments(),
            charges,
            fx.notifier(),
            RecurringBillingConfig::default().with_interval(Duration::from_millis(20)),
        ));

        let (tx, rx) = watch::channel(false);
        let task = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run(rx).await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            while fx.notifier.count_of("subscription_renewed") == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn shutdown_before_first_tick_skips_scanning() {
        let fx = Fixture::new();
        fx.lapsed_user("1", Some("pm-1")).await;
        let scheduler = scheduler(&fx, fx.gateway());

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        scheduler.run(rx).await.unwrap();

        assert!(!fx.gateway.was_called("create_payment"));
    }
}
