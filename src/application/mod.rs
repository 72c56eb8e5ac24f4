//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::billing::{
    // Commands
    CancelAutoRenewalCommand, CancelAutoRenewalHandler, CancelAutoRenewalResult,
    CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult,
    CreateGiftCommand, CreateGiftHandler, CreateGiftResult,
    CreateRecurringChargeCommand, CreateRecurringChargeHandler, CreateRecurringChargeResult,
    GrantPremiumCommand, GrantPremiumHandler, GrantPremiumResult,
    HandlePaymentNotificationCommand, HandlePaymentNotificationHandler, NotificationOutcome,
    RedeemGiftCommand, RedeemGiftHandler, RedeemGiftResult,
    RegisterUserCommand, RegisterUserHandler, RegisterUserResult,
    // Queries
    GetSubscriptionInfoHandler, GetSubscriptionInfoQuery, GetSubscriptionInfoResult,
    ListGiftsHandler, ListGiftsQuery, ListGiftsResult,
    ListPaymentsHandler, ListPaymentsQuery, ListPaymentsResult,
    QueryPaymentStatusHandler, QueryPaymentStatusQuery, QueryPaymentStatusResult,
};
