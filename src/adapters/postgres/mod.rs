//! PostgreSQL adapters - Database implementations for the storage ports.
//!
//! - `PostgresEntitlementStore` - Per-user premium status
//! - `PostgresPaymentLedger` - Payment attempts with row-locked status updates
//! - `PostgresGiftLedger` - Gift codes with transactional redemption
//!
//! Schema lives in `migrations/`.

mod entitlement_store;
mod gift_ledger;
mod payment_ledger;
mod rows;

pub use entitlement_store::PostgresEntitlementStore;
pub use gift_ledger::PostgresGiftLedger;
pub use payment_ledger::PostgresPaymentLedger;
