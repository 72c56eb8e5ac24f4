//! Payment records, statuses, and amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{PaymentId, Timestamp, UserId, ValidationError};

use super::PaymentKind;

/// Monetary amount in minor units (kopecks, cents).
///
/// Never stored as floating point; the gateway exchanges amounts as
/// two-decimal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Gateway wire form, e.g. `"250.00"`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    /// Parses `"250"`, `"250.0"`, or `"250.00"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::invalid_format("amount", format!("'{}' is not a decimal amount", s));
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty()
            || frac.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let minor = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -minor } else { minor }))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

/// Gateway-reported payment status.
///
/// Transitions only move forward:
///
/// ```text
/// Pending ──► WaitingForCapture ──► Succeeded
///    │               │
///    └───────────────┴────────────► Canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    WaitingForCapture,
    Succeeded,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::WaitingForCapture => "waiting_for_capture",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Canceled)
    }

    /// Returns true if moving from self to target is a forward step.
    pub fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, WaitingForCapture)
                | (Pending, Succeeded)
                | (Pending, Canceled)
                | (WaitingForCapture, Succeeded)
                | (WaitingForCapture, Canceled)
        )
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "waiting_for_capture" => Ok(PaymentStatus::WaitingForCapture),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "canceled" => Ok(PaymentStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of an atomic status write in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Status moved forward from `from`.
    Transitioned { from: PaymentStatus },
    /// Stored status already equals the requested one.
    Unchanged,
    /// Requested status would move backwards; the stored one is kept.
    Rejected { current: PaymentStatus },
}

impl StatusChange {
    /// Decides the change for `current -> requested`.
    pub fn evaluate(current: PaymentStatus, requested: PaymentStatus) -> Self {
        if current == requested {
            StatusChange::Unchanged
        } else if current.can_transition_to(&requested) {
            StatusChange::Transitioned { from: current }
        } else {
            StatusChange::Rejected { current }
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, StatusChange::Transitioned { .. })
    }
}

/// One payment attempt as known to the ledger.
///
/// Immutable except for `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub kind: PaymentKind,
    pub amount: Amount,
    pub currency: String,
    pub status: PaymentStatus,
    pub is_recurring: bool,
    pub description: String,
    pub instrument_ref: Option<String>,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_parses_gateway_decimals() {
        assert_eq!("250.00".parse::<Amount>().unwrap(), Amount::from_minor(25_000));
        assert_eq!("1.00".parse::<Amount>().unwrap(), Amount::from_minor(100));
        assert_eq!("1.5".parse::<Amount>().unwrap(), Amount::from_minor(150));
        assert_eq!("7".parse::<Amount>().unwrap(), Amount::from_minor(700));
    }

    #[test]
    fn amount_rejects_garbage() {
        assert!("".parse::<Amount>().is_err());
        assert!("1.005".parse::<Amount>().is_err());
        assert!("abc".parse::<Amount>().is_err());
        assert!(".50".parse::<Amount>().is_err());
    }

    #[test]
    fn amount_formats_with_two_decimals() {
        assert_eq!(Amount::from_minor(25_000).to_decimal_string(), "250.00");
        assert_eq!(Amount::from_minor(105).to_string(), "1.05");
        assert_eq!(Amount::from_minor(-5).to_string(), "-0.05");
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::WaitingForCapture,
            PaymentStatus::Succeeded,
            PaymentStatus::Canceled,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_transitions() {
        use PaymentStatus::*;
        for target in [Pending, WaitingForCapture, Succeeded, Canceled] {
            assert!(!Succeeded.can_transition_to(&target));
            assert!(!Canceled.can_transition_to(&target));
        }
    }

    #[test]
    fn status_never_moves_backwards() {
        use PaymentStatus::*;
        assert!(!WaitingForCapture.can_transition_to(&Pending));
        assert!(Pending.can_transition_to(&WaitingForCapture));
        assert!(WaitingForCapture.can_transition_to(&Succeeded));
    }

    #[test]
    fn status_change_classifies_writes() {
        use PaymentStatus::*;
        assert_eq!(
            StatusChange::evaluate(Pending, Succeeded),
            StatusChange::Transitioned { from: Pending }
        );
        assert_eq!(StatusChange::evaluate(Succeeded, Succeeded), StatusChange::Unchanged);
        assert_eq!(
            StatusChange::evaluate(Canceled, Succeeded),
            StatusChange::Rejected { current: Canceled }
        );
    }
}
