//! Billing error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Gateway | 502 |
//! | MalformedEvent | 400 |
//! | UnknownUser | 404 |
//! | UnknownUsername | 404 |
//! | PaymentNotFound | 404 |
//! | NoSavedInstrument | 409 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, UserId, ValidationError};

/// Errors surfaced by billing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Network, auth, or provider-side failure talking to the gateway.
    #[error("Payment gateway error: {message}")]
    Gateway { message: String, retryable: bool },

    /// Notification payload missing required fields or not JSON.
    #[error("Malformed payment notification: {0}")]
    MalformedEvent(String),

    /// Referenced user is absent from the entitlement store.
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    /// Operator lookup by username found nobody.
    #[error("Unknown username: {0}")]
    UnknownUsername(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    #[error("No saved payment method for user {0}")]
    NoSavedInstrument(UserId),

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn gateway(message: impl Into<String>, retryable: bool) -> Self {
        BillingError::Gateway {
            message: message.into(),
            retryable,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        BillingError::MalformedEvent(reason.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::Gateway { .. } => ErrorCode::GatewayError,
            BillingError::MalformedEvent(_) => ErrorCode::MalformedEvent,
            BillingError::UnknownUser(_) | BillingError::UnknownUsername(_) => {
                ErrorCode::UserNotFound
            }
            BillingError::PaymentNotFound(_) => ErrorCode::PaymentNotFound,
            BillingError::NoSavedInstrument(_) => ErrorCode::NoSavedInstrument,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Message safe to show to an end user.
    pub fn message(&self) -> String {
        match self {
            BillingError::Gateway { .. } => {
                "Payment service is temporarily unavailable, please try again later".to_string()
            }
            BillingError::MalformedEvent(reason) => format!("Malformed notification: {}", reason),
            BillingError::UnknownUser(_) => "User not found".to_string(),
            BillingError::UnknownUsername(name) => format!("No user with username @{}", name),
            BillingError::PaymentNotFound(_) => "Payment not found".to_string(),
            BillingError::NoSavedInstrument(_) => {
                "Automatic renewal is not enabled".to_string()
            }
            BillingError::ValidationFailed { field, message } => {
                format!("Invalid {}: {}", field, message)
            }
            BillingError::Infrastructure(_) => "An internal error occurred".to_string(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::Gateway { retryable, .. } => *retryable,
            BillingError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            ErrorCode::UserNotFound => match err
                .details
                .get("user_id")
                .and_then(|id| UserId::new(id.clone()).ok())
            {
                Some(user_id) => BillingError::UnknownUser(user_id),
                None => BillingError::Infrastructure(err.message),
            },
            ErrorCode::PaymentNotFound => match err
                .details
                .get("payment_id")
                .and_then(|id| PaymentId::new(id.clone()).ok())
            {
                Some(payment_id) => BillingError::PaymentNotFound(payment_id),
                None => BillingError::Infrastructure(err.message),
            },
            ErrorCode::MalformedEvent => BillingError::MalformedEvent(err.message),
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// Not-found error for a user, carrying the id for later mapping.
pub fn user_not_found(user_id: &UserId) -> DomainError {
    DomainError::new(ErrorCode::UserNotFound, format!("User {} not found", user_id))
        .with_detail("user_id", user_id.as_str())
}

/// Not-found error for a payment, carrying the id for later mapping.
pub fn payment_not_found(payment_id: &PaymentId) -> DomainError {
    DomainError::new(
        ErrorCode::PaymentNotFound,
        format!("Payment {} not found", payment_id),
    )
    .with_detail("payment_id", payment_id.as_str())
}
