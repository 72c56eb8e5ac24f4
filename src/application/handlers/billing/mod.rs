//! Billing handlers.
//!
//! Command and query handlers for the premium subscription lifecycle:
//!
//! ## Commands
//! - Registering users on first contact
//! - Starting checkouts (trial, regular, gift)
//! - Charging saved instruments off-session (scheduler only)
//! - Reconciling gateway payment notifications
//! - Redeeming gift codes
//! - Cancelling auto-renewal
//! - Operator premium grants
//!
//! ## Queries
//! - Subscription info
//! - Payment status at the gateway
//! - Payment and gift history

mod cancel_auto_renewal;
mod create_checkout;
mod create_gift;
mod create_recurring_charge;
mod get_subscription_info;
mod grant_premium;
mod handle_payment_notification;
mod list_gifts;
mod list_payments;
mod query_payment_status;
mod redeem_gift;
mod register_user;

#[cfg(test)]
pub(crate) mod test_support;

// Commands
pub use cancel_auto_renewal::{
    CancelAutoRenewalCommand, CancelAutoRenewalHandler, CancelAutoRenewalResult,
};
pub use create_checkout::{CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult};
pub use create_gift::{CreateGiftCommand, CreateGiftHandler, CreateGiftResult};
pub use create_recurring_charge::{
    CreateRecurringChargeCommand, CreateRecurringChargeHandler, CreateRecurringChargeResult,
};
pub use grant_premium::{
    GrantPremiumCommand, GrantPremiumHandler, GrantPremiumResult, GRANTABLE_DAYS,
};
pub use handle_payment_notification::{
    HandlePaymentNotificationCommand, HandlePaymentNotificationHandler, NotificationOutcome,
};
pub use redeem_gift::{RedeemGiftCommand, RedeemGiftHandler, RedeemGiftResult};
pub use register_user::{RegisterUserCommand, RegisterUserHandler, RegisterUserResult};

// Queries
pub use get_subscription_info::{
    GetSubscriptionInfoHandler, GetSubscriptionInfoQuery, GetSubscriptionInfoResult,
};
pub use list_gifts::{ListGiftsHandler, ListGiftsQuery, ListGiftsResult};
pub use list_payments::{ListPaymentsHandler, ListPaymentsQuery, ListPaymentsResult};
pub use query_payment_status::{
    QueryPaymentStatusHandler, QueryPaymentStatusQuery, QueryPaymentStatusResult,
};
