//! In-memory billing storage for testing and single-process deployments.
//!
//! One `InMemoryBillingStore` implements all three storage ports over a single
//! lock, so cross-table operations such as gift redemption are atomic.
//! Not suitable for multi-server deployments.

mod entitlement_store;
mod gift_ledger;
mod payment_ledger;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{Entitlement, Gift, PaymentRecord};
use crate::domain::foundation::{GiftCode, PaymentId, UserId};

#[derive(Debug, Default)]
struct BillingTables {
    users: HashMap<UserId, Entitlement>,
    payments: HashMap<PaymentId, PaymentRecord>,
    gifts: HashMap<GiftCode, Gift>,
}

/// Shared in-memory entitlement, payment, and gift storage.
///
/// Cloning yields another handle to the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    tables: Arc<RwLock<BillingTables>>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entitlement row as-is (fixtures, imports).
    pub async fn put_entitlement(&self, entitlement: Entitlement) {
        self.tables
            .write()
            .await
            .users
            .insert(entitlement.user_id.clone(), entitlement);
    }

    /// Raw row without lazy-expiry evaluation.
    pub async fn entitlement_snapshot(&self, user_id: &UserId) -> Option<Entitlement> {
        self.tables.read().await.users.get(user_id).cloned()
    }

    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }
}
