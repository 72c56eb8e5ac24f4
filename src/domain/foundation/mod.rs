//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, time values, and error types that form the
//! vocabulary of the billing domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{GiftCode, PaymentId, UserId};
pub use timestamp::Timestamp;
