//! Payment gateway port for external payment processing.
//!
//! Defines the contract for redirect-based checkout gateways (e.g., YooKassa).
//! The gateway creates payments and reports their status; it never decides
//! entitlement.
//!
//! # Design
//!
//! - **Gateway agnostic**: Interface works with any redirect-checkout provider
//! - **Idempotent**: Every create carries its own idempotency key

use crate::domain::billing::{
    Amount, BillingError, PaymentKind, PaymentStatus, ReportedInstrument,
};
use crate::domain::foundation::{DomainError, ErrorCode, GiftCode, PaymentId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment.
    ///
    /// Checkout kinds return a confirmation URL; off-session charges with a
    /// saved instrument return none.
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<GatewayPayment, PaymentError>;

    /// Fetch the current state of a payment.
    async fn get_payment(&self, payment_id: &PaymentId) -> Result<GatewayPayment, PaymentError>;
}

/// Request to create a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub user_id: UserId,
    pub kind: PaymentKind,
    pub amount: Amount,
    pub currency: String,
    pub description: String,
    /// Echoed back in notifications for gift purchases.
    pub gift_code: Option<GiftCode>,
    /// Ask the gateway to keep the method for later charges.
    pub save_instrument: bool,
    /// Saved method to charge off-session.
    pub instrument_ref: Option<String>,
    /// Where the browser returns after confirmation. `None` for off-session charges.
    pub return_url: Option<String>,
    /// Unique per attempt.
    pub idempotency_key: String,
}

/// A payment as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    pub id: PaymentId,
    pub status: PaymentStatus,
    pub amount: Amount,
    pub currency: String,
    /// URL the user must visit to confirm the payment.
    pub confirmation_url: Option<String>,
    pub instrument: Option<ReportedInstrument>,
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Override retryability (e.g., provider 5xx).
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(
            PaymentErrorCode::NotFound,
            format!("{} not found", resource),
        )
    }

    /// Create a provider-side error from an HTTP status.
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message).with_retryable(status >= 500)
    }

    /// Create an error for a response that could not be understood.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        BillingError::gateway(err.to_string(), err.retryable)
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let mut domain = DomainError::new(ErrorCode::GatewayError, err.message);
        if let Some(code) = err.provider_code {
            domain = domain.with_detail("provider_code", code);
        }
        domain
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider rejected or failed the request.
    ProviderError,

    /// Response body did not match the expected shape.
    InvalidResponse,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}
