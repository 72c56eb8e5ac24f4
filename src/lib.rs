//! Premium Billing - subscription and payment lifecycle engine
//!
//! Tracks time-boxed premium entitlement per user and drives it from payment
//! gateway events: checkouts, webhook reconciliation, hourly recurring
//! renewal, and gift codes that grant premium to another user.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
