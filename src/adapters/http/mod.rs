//! HTTP adapters - REST API implementations.

pub mod billing;

// Re-export key types for convenience
pub use billing::{billing_app, billing_router, BillingAppState, BillingLinks};
