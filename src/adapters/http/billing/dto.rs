//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.
//! They serve as the boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    CancelAutoRenewalResult, CreateCheckoutResult, GetSubscriptionInfoResult, GrantPremiumResult,
    ListGiftsResult, QueryPaymentStatusResult, RedeemGiftResult, RegisterUserResult,
};
use crate::domain::billing::{Gift, PaymentKind, PaymentRecord, PaymentStatus};
use crate::domain::foundation::Timestamp;

fn rfc3339(ts: &Timestamp) -> String {
    ts.as_datetime().to_rfc3339()
}

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to register a user on first contact.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserRequest {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

/// Request to start a checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// `trial`, `regular` or `gift`.
    pub kind: PaymentKind,
}

/// Request to buy a gift subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGiftRequest {
    pub sender_id: String,
}

/// Request to redeem a gift code.
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemGiftRequest {
    pub recipient_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

/// Operator request to grant premium by username.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantPremiumRequest {
    pub username: String,
    pub days: u32,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub is_premium: bool,
    pub registered_at: String,
}

impl From<RegisterUserResult> for UserResponse {
    fn from(result: RegisterUserResult) -> Self {
        let e = result.entitlement;
        Self {
            user_id: e.user_id.to_string(),
            username: e.profile.username,
            first_name: e.profile.first_name,
            is_premium: result.is_premium,
            registered_at: rfc3339(&e.registered_at),
        }
    }
}

/// Subscription state as shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub user_id: String,
    pub is_premium: bool,
    /// Null when never granted or permanent.
    pub premium_until: Option<String>,
    pub trial_used: bool,
    pub trial_available: bool,
    pub auto_renewal: bool,
}

impl From<GetSubscriptionInfoResult> for SubscriptionResponse {
    fn from(result: GetSubscriptionInfoResult) -> Self {
        Self {
            trial_available: result.trial_available(),
            user_id: result.user_id.to_string(),
            is_premium: result.is_premium,
            premium_until: result.premium_until.as_ref().map(rfc3339),
            trial_used: result.trial_used,
            auto_renewal: result.auto_renewal,
        }
    }
}

/// Started checkout; the browser goes to `redirect_url`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub payment_id: String,
    pub kind: PaymentKind,
    /// Decimal string, e.g. `"250.00"`.
    pub amount: String,
    pub currency: String,
    pub redirect_url: Option<String>,
}

impl From<CreateCheckoutResult> for CheckoutResponse {
    fn from(result: CreateCheckoutResult) -> Self {
        Self {
            payment_id: result.payment_id.to_string(),
            kind: result.kind,
            amount: result.amount.to_decimal_string(),
            currency: result.currency,
            redirect_url: result.redirect_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoRenewalResponse {
    pub auto_renewal: bool,
    pub is_premium: bool,
    pub premium_until: Option<String>,
}

impl From<CancelAutoRenewalResult> for AutoRenewalResponse {
    fn from(result: CancelAutoRenewalResult) -> Self {
        Self {
            auto_renewal: false,
            is_premium: result.is_premium,
            premium_until: result.premium_until.as_ref().map(rfc3339),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub payment_id: String,
    pub kind: PaymentKind,
    pub amount: String,
    pub currency: String,
    pub status: PaymentStatus,
    pub is_recurring: bool,
    pub description: String,
    pub created_at: String,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            payment_id: record.payment_id.to_string(),
            kind: record.kind,
            amount: record.amount.to_decimal_string(),
            currency: record.currency,
            status: record.status,
            is_recurring: record.is_recurring,
            description: record.description,
            created_at: rfc3339(&record.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusResponse {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub recorded_status: Option<PaymentStatus>,
}

impl From<QueryPaymentStatusResult> for PaymentStatusResponse {
    fn from(result: QueryPaymentStatusResult) -> Self {
        Self {
            payment_id: result.payment_id.to_string(),
            status: result.status,
            recorded_status: result.recorded_status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GiftResponse {
    pub code: String,
    pub paid_at: Option<String>,
    pub is_redeemed: bool,
    pub redeemed_by: Option<String>,
    pub created_at: String,
    pub redeemed_at: Option<String>,
}

impl From<Gift> for GiftResponse {
    fn from(gift: Gift) -> Self {
        Self {
            code: gift.code.to_string(),
            paid_at: gift.paid_at.as_ref().map(rfc3339),
            is_redeemed: gift.is_redeemed,
            redeemed_by: gift.redeemed_by.map(|u| u.to_string()),
            created_at: rfc3339(&gift.created_at),
            redeemed_at: gift.redeemed_at.as_ref().map(rfc3339),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GiftListResponse {
    pub gifts: Vec<GiftResponse>,
    pub redeemed_count: usize,
}

impl From<ListGiftsResult> for GiftListResponse {
    fn from(result: ListGiftsResult) -> Self {
        let redeemed_count = result.redeemed_count();
        Self {
            gifts: result.gifts.into_iter().map(GiftResponse::from).collect(),
            redeemed_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedeemGiftResponse {
    pub redeemed: bool,
    pub premium_until: Option<String>,
    /// Why the code was not accepted.
    pub reason: Option<String>,
}

impl From<RedeemGiftResult> for RedeemGiftResponse {
    fn from(result: RedeemGiftResult) -> Self {
        match result {
            RedeemGiftResult::Redeemed { premium_until } => Self {
                redeemed: true,
                premium_until: premium_until.as_ref().map(rfc3339),
                reason: None,
            },
            RedeemGiftResult::Rejected(rejection) => Self {
                redeemed: false,
                premium_until: None,
                reason: Some(rejection.message().to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GrantPremiumResponse {
    pub user_id: String,
    pub premium_until: Option<String>,
}

impl From<GrantPremiumResult> for GrantPremiumResponse {
    fn from(result: GrantPremiumResult) -> Self {
        Self {
            user_id: result.user_id.to_string(),
            premium_until: result.premium_until.as_ref().map(rfc3339),
        }
    }
}

/// Standard error response format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
