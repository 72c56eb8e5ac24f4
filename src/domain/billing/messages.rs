//! Outbound user-facing notifications produced by the billing engine.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::PaymentKind;

/// Message addressed to a single user through the notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BillingNotification {
    /// Funds are held, capture pending.
    PaymentAuthorized,
    /// Premium activated or extended by a checkout.
    PaymentSucceeded {
        kind: PaymentKind,
        premium_until: Option<Timestamp>,
    },
    PaymentCanceled,
    /// Gift purchase completed; `link` is absent when no link template is configured.
    GiftPurchased { link: Option<String> },
    /// Gift was paid for, but the payment carried no code to activate.
    GiftCodeMissing,
    /// Recipient side of a redemption.
    GiftRedeemed { premium_until: Option<Timestamp> },
    /// Operator granted premium directly.
    PremiumGranted {
        days: u32,
        premium_until: Option<Timestamp>,
    },
    SubscriptionRenewed { premium_until: Option<Timestamp> },
    RenewalFailed,
}

impl BillingNotification {
    /// Short machine-readable name used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            BillingNotification::PaymentAuthorized => "payment_authorized",
            BillingNotification::PaymentSucceeded { .. } => "payment_succeeded",
            BillingNotification::PaymentCanceled => "payment_canceled",
            BillingNotification::GiftPurchased { .. } => "gift_purchased",
            BillingNotification::GiftCodeMissing => "gift_code_missing",
            BillingNotification::GiftRedeemed { .. } => "gift_redeemed",
            BillingNotification::PremiumGranted { .. } => "premium_granted",
            BillingNotification::SubscriptionRenewed { .. } => "subscription_renewed",
            BillingNotification::RenewalFailed => "renewal_failed",
        }
    }

    /// Rendered text for the user.
    pub fn text(&self) -> String {
        match self {
            BillingNotification::PaymentAuthorized => {
                "Your payment has been authorized and is being processed.".to_string()
            }
            BillingNotification::PaymentSucceeded {
                kind,
                premium_until,
            } => {
                let lead = match kind {
                    PaymentKind::Trial => "Your trial premium subscription is active",
                    _ => "Your premium subscription is active",
                };
                format!("{}{}.", lead, until_suffix(premium_until))
            }
            BillingNotification::PaymentCanceled => {
                "Your payment was canceled. No charge was made, you can try again at any time."
                    .to_string()
            }
            BillingNotification::GiftPurchased { link: Some(link) } => format!(
                "Thank you for your gift! Share this link with the recipient: {}",
                link
            ),
            BillingNotification::GiftPurchased { link: None } => {
                "Thank you for your gift! The gift link is temporarily unavailable, please contact support."
                    .to_string()
            }
            BillingNotification::GiftCodeMissing => {
                "Thank you for your gift! Your payment was received, but we could not issue a gift code. Please contact support and we will sort it out."
                    .to_string()
            }
            BillingNotification::GiftRedeemed { premium_until } => {
                format!("Gift redeemed! Premium is active{}.", until_suffix(premium_until))
            }
            BillingNotification::PremiumGranted {
                days,
                premium_until,
            } => format!(
                "You have been granted {} days of premium{}.",
                days,
                until_suffix(premium_until)
            ),
            BillingNotification::SubscriptionRenewed { premium_until } => format!(
                "Your premium subscription has been renewed{}.",
                until_suffix(premium_until)
            ),
            BillingNotification::RenewalFailed => {
                "We could not renew your premium subscription. Please check your payment method and subscribe again."
                    .to_string()
            }
        }
    }
}

fn until_suffix(until: &Option<Timestamp>) -> String {
    match until {
        Some(ts) => format!(" until {}", ts),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gift_without_link_mentions_unavailability() {
        let text = BillingNotification::GiftPurchased { link: None }.text();
        assert!(text.contains("temporarily unavailable"));
    }

    #[test]
    fn missing_gift_code_text_differs_from_missing_link() {
        let missing_code = BillingNotification::GiftCodeMissing.text();
        assert!(missing_code.contains("could not issue a gift code"));
        assert_ne!(missing_code, BillingNotification::GiftPurchased { link: None }.text());
        assert_eq!(BillingNotification::GiftCodeMissing.kind_name(), "gift_code_missing");
    }

    #[test]
    fn gift_with_link_includes_it() {
        let text = BillingNotification::GiftPurchased {
            link: Some("https://example.com/g".to_string()),
        }
        .text();
        assert!(text.ends_with("https://example.com/g"));
    }

    #[test]
    fn success_text_includes_expiry() {
        let until = Timestamp::now().add_days(3);
        let text = BillingNotification::PaymentSucceeded {
            kind: PaymentKind::Trial,
            premium_until: Some(until),
        }
        .text();
        assert!(text.starts_with("Your trial"));
        assert!(text.contains(&until.to_string()));
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(BillingNotification::RenewalFailed).unwrap();
        assert_eq!(json["type"], "renewal_failed");
    }
}
