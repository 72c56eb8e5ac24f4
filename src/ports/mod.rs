//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `EntitlementStore` - Per-user premium status with lazy expiry
//! - `PaymentLedger` - Payment attempts with monotonic status
//! - `GiftLedger` - Gift codes and transactional redemption
//!
//! ## Integration Ports
//!
//! - `PaymentGateway` - External checkout and charge API
//! - `Notifier` - User-facing notification channel

mod entitlement_store;
mod gift_ledger;
mod notifier;
mod payment_gateway;
mod payment_ledger;

pub use entitlement_store::EntitlementStore;
pub use gift_ledger::{GiftLedger, RedeemOutcome};
pub use notifier::{notify_best_effort, Notifier};
pub use payment_gateway::{
    CreatePaymentRequest, GatewayPayment, PaymentError, PaymentErrorCode, PaymentGateway,
};
pub use payment_ledger::{PaymentLedger, SaveResult};
