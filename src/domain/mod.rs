//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Entitlement, payments, gifts, and gateway events

pub mod billing;
pub mod foundation;
