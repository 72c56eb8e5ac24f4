//! Payment kinds and the per-kind checkout policy table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

use super::Amount;

/// What a payment buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Introductory charge, offered once per user.
    Trial,
    /// Standard user-initiated purchase.
    Regular,
    /// Off-session renewal with a saved instrument.
    Recurring,
    /// Purchase of a redeemable code for another user.
    Gift,
}

/// Pricing and behavior of one payment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindPolicy {
    pub amount: Amount,
    pub currency: &'static str,
    pub description: &'static str,
    /// Days of premium granted on success (to the recipient for gifts).
    pub grant_days: u32,
    /// Ask the gateway to keep the payment method for renewals.
    pub save_instrument: bool,
    /// Needs a browser redirect to confirm.
    pub requires_confirmation: bool,
    pub is_recurring: bool,
}

pub const DEFAULT_CURRENCY: &str = "RUB";

const TRIAL: KindPolicy = KindPolicy {
    amount: Amount::from_minor(100),
    currency: DEFAULT_CURRENCY,
    description: "Trial premium subscription for 3 days",
    grant_days: 3,
    save_instrument: true,
    requires_confirmation: true,
    is_recurring: false,
};

const REGULAR: KindPolicy = KindPolicy {
    amount: Amount::from_minor(25_000),
    currency: DEFAULT_CURRENCY,
    description: "Premium subscription for 30 days",
    grant_days: 30,
    save_instrument: true,
    requires_confirmation: true,
    is_recurring: false,
};

const RECURRING: KindPolicy = KindPolicy {
    amount: Amount::from_minor(25_000),
    currency: DEFAULT_CURRENCY,
    description: "Premium subscription renewal for 30 days",
    grant_days: 30,
    save_instrument: false,
    requires_confirmation: false,
    is_recurring: true,
};

const GIFT: KindPolicy = KindPolicy {
    amount: Amount::from_minor(25_000),
    currency: DEFAULT_CURRENCY,
    description: "Gift premium subscription for 30 days",
    grant_days: 30,
    save_instrument: false,
    requires_confirmation: true,
    is_recurring: false,
};

impl PaymentKind {
    pub fn policy(&self) -> &'static KindPolicy {
        match self {
            PaymentKind::Trial => &TRIAL,
            PaymentKind::Regular => &REGULAR,
            PaymentKind::Recurring => &RECURRING,
            PaymentKind::Gift => &GIFT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Trial => "trial",
            PaymentKind::Regular => "regular",
            PaymentKind::Recurring => "recurring",
            PaymentKind::Gift => "gift",
        }
    }

    /// Kind actually charged: a trial is only offered once.
    pub fn effective(self, trial_used: bool) -> Self {
        match self {
            PaymentKind::Trial if trial_used => PaymentKind::Regular,
            other => other,
        }
    }

    /// Whether success extends the payer's own entitlement.
    pub fn grants_payer(&self) -> bool {
        !matches!(self, PaymentKind::Gift)
    }
}

impl FromStr for PaymentKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(PaymentKind::Trial),
            "regular" => Ok(PaymentKind::Regular),
            "recurring" => Ok(PaymentKind::Recurring),
            "gift" => Ok(PaymentKind::Gift),
            other => Err(ValidationError::invalid_format(
                "payment_type",
                format!("unknown payment type '{}'", other),
            )),
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_is_one_ruble_for_three_days() {
        let p = PaymentKind::Trial.policy();
        assert_eq!(p.amount.to_decimal_string(), "1.00");
        assert_eq!(p.grant_days, 3);
        assert!(p.save_instrument);
    }

    #[test]
    fn paid_kinds_cost_standard_price_for_thirty_days() {
        for kind in [PaymentKind::Regular, PaymentKind::Recurring, PaymentKind::Gift] {
            assert_eq!(kind.policy().amount.to_decimal_string(), "250.00");
            assert_eq!(kind.policy().grant_days, 30);
        }
    }

    #[test]
    fn recurring_is_off_session() {
        let p = PaymentKind::Recurring.policy();
        assert!(!p.requires_confirmation);
        assert!(p.is_recurring);
    }

    #[test]
    fn gift_does_not_save_payers_instrument() {
        assert!(!PaymentKind::Gift.policy().save_instrument);
        assert!(!PaymentKind::Gift.grants_payer());
    }

    #[test]
    fn used_trial_falls_back_to_regular() {
        assert_eq!(PaymentKind::Trial.effective(true), PaymentKind::Regular);
        assert_eq!(PaymentKind::Trial.effective(false), PaymentKind::Trial);
        assert_eq!(PaymentKind::Gift.effective(true), PaymentKind::Gift);
    }

    #[test]
    fn kind_parses_metadata_names() {
        assert_eq!("recurring".parse::<PaymentKind>().unwrap(), PaymentKind::Recurring);
        assert!("bonus".parse::<PaymentKind>().is_err());
    }
}
