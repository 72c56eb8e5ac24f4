//! Shared wiring for billing handler tests.

use std::sync::Arc;

use crate::adapters::memory::InMemoryBillingStore;
use crate::adapters::notification::RecordingNotifier;
use crate::adapters::yookassa::MockPaymentGateway;
use crate::domain::billing::{Entitlement, UserProfile};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{EntitlementStore, GiftLedger, Notifier, PaymentGateway, PaymentLedger};

pub(crate) struct Fixture {
    pub store: InMemoryBillingStore,
    pub gateway: MockPaymentGateway,
    pub notifier: RecordingNotifier,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: InMemoryBillingStore::new(),
            gateway: MockPaymentGateway::new(),
            notifier: RecordingNotifier::new(),
        }
    }

    pub fn entitlements(&self) -> Arc<dyn EntitlementStore> {
        Arc::new(self.store.clone())
    }

    pub fn payments(&self) -> Arc<dyn PaymentLedger> {
        Arc::new(self.store.clone())
    }

    pub fn gifts(&self) -> Arc<dyn GiftLedger> {
        Arc::new(self.store.clone())
    }

    pub fn gateway(&self) -> Arc<dyn PaymentGateway> {
        Arc::new(self.gateway.clone())
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::new(self.notifier.clone())
    }

    pub async fn user(&self, id: &str) -> UserId {
        let user_id = UserId::new(id).unwrap();
        self.store
            .upsert_new_user(&user_id, &UserProfile::default())
            .await
            .unwrap();
        user_id
    }

    pub async fn named_user(&self, id: &str, username: &str) -> UserId {
        let user_id = UserId::new(id).unwrap();
        self.store
            .upsert_new_user(&user_id, &UserProfile::new(Some(username.to_string()), None))
            .await
            .unwrap();
        user_id
    }

    /// Premium that lapsed an hour ago, optionally with a saved instrument.
    pub async fn lapsed_user(&self, id: &str, instrument: Option<&str>) -> UserId {
        let now = Timestamp::now();
        let user_id = UserId::new(id).unwrap();
        let mut e = Entitlement::new(user_id.clone(), UserProfile::default(), now);
        e.is_premium = true;
        e.premium_until = Some(now.minus_hours(1));
        e.instrument_ref = instrument.map(str::to_string);
        self.store.put_entitlement(e).await;
        user_id
    }

    pub async fn entitlement(&self, user_id: &UserId) -> Entitlement {
        self.store.entitlement_snapshot(user_id).await.unwrap()
    }
}
