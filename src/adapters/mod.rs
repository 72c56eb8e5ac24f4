//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `http` - axum routes for the gateway webhook and the billing API
//! - `memory` - in-memory storage for tests and single-process runs
//! - `notification` - user-facing message delivery
//! - `postgres` - PostgreSQL storage
//! - `scheduler` - the recurring billing loop
//! - `yookassa` - the payment gateway client

pub mod http;
pub mod memory;
pub mod notification;
pub mod postgres;
pub mod scheduler;
pub mod yookassa;

pub use memory::InMemoryBillingStore;
pub use notification::{HttpRelayNotifier, LogNotifier, RecordingNotifier};
pub use postgres::{PostgresEntitlementStore, PostgresGiftLedger, PostgresPaymentLedger};
pub use scheduler::{RecurringBillingConfig, RecurringBillingScheduler, RenewalReport};
pub use yookassa::{ConcurrencyLimitedGateway, MockPaymentGateway, YooKassaConfig, YooKassaGateway};
