//! Billing domain module.
//!
//! Premium entitlement, payment records, gift codes, and the messages
//! exchanged with the payment gateway and the notification channel.
//!
//! # Module Structure
//!
//! - `entitlement` - Per-user premium status with lazy expiry
//! - `payment` - Payment records, monotonic status, amounts
//! - `kind` - Payment kinds and the checkout policy table
//! - `gift` - Redeemable gift codes
//! - `notification` - Inbound gateway events
//! - `messages` - Outbound user notifications
//! - `errors` - Billing error taxonomy

mod entitlement;
mod errors;
mod gift;
mod kind;
mod messages;
mod notification;
mod payment;

pub use entitlement::{normalize_username, Entitlement, PremiumGrant, UserProfile};
pub use errors::{payment_not_found, user_not_found, BillingError};
pub use gift::{render_gift_link, Gift, RedeemRejection};
pub use kind::{KindPolicy, PaymentKind, DEFAULT_CURRENCY};
pub use messages::BillingNotification;
pub use notification::{
    ParsedNotification, PaymentNotification, ReportedInstrument, HANDLED_EVENTS,
};
pub use payment::{Amount, PaymentRecord, PaymentStatus, StatusChange};
