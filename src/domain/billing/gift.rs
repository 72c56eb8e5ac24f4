//! Gift codes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GiftCode, Timestamp, UserId};

/// A purchased, shareable premium grant.
///
/// # Invariants
///
/// - only a paid gift can be redeemed
/// - `is_redeemed` flips from false to true exactly once
/// - the redeemer is never the sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gift {
    pub code: GiftCode,
    pub sender_id: UserId,
    pub is_paid: bool,
    pub paid_at: Option<Timestamp>,
    pub is_redeemed: bool,
    pub redeemed_by: Option<UserId>,
    pub created_at: Timestamp,
    pub redeemed_at: Option<Timestamp>,
}

/// Why a redemption attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemRejection {
    UnknownCode,
    NotPaid,
    AlreadyRedeemed,
    SelfRedemption,
}

impl RedeemRejection {
    pub fn message(&self) -> &'static str {
        match self {
            RedeemRejection::UnknownCode => "Gift code not found",
            RedeemRejection::NotPaid => "This gift has not been paid for yet",
            RedeemRejection::AlreadyRedeemed => "Gift code has already been redeemed",
            RedeemRejection::SelfRedemption => "You cannot redeem your own gift",
        }
    }
}

impl Gift {
    /// A code reserved at checkout. It stays unredeemable until paid.
    pub fn issue(code: GiftCode, sender_id: UserId, now: Timestamp) -> Self {
        Self {
            code,
            sender_id,
            is_paid: false,
            paid_at: None,
            is_redeemed: false,
            redeemed_by: None,
            created_at: now,
            redeemed_at: None,
        }
    }

    /// Same code, already settled by a successful gift payment.
    pub fn paid(mut self, now: Timestamp) -> Self {
        self.mark_paid(now);
        self
    }

    /// Records the gift payment. Repeating it keeps the first `paid_at`.
    pub fn mark_paid(&mut self, now: Timestamp) {
        if !self.is_paid {
            self.is_paid = true;
            self.paid_at = Some(now);
        }
    }

    /// Checks redemption rules without mutating.
    pub fn check_redeemable_by(&self, recipient: &UserId) -> Result<(), RedeemRejection> {
        if !self.is_paid {
            return Err(RedeemRejection::NotPaid);
        }
        if self.is_redeemed {
            return Err(RedeemRejection::AlreadyRedeemed);
        }
        if &self.sender_id == recipient {
            return Err(RedeemRejection::SelfRedemption);
        }
        Ok(())
    }

    /// Marks the gift redeemed by `recipient`.
    pub fn redeem(&mut self, recipient: &UserId, now: Timestamp) -> Result<(), RedeemRejection> {
        self.check_redeemable_by(recipient)?;
        self.is_redeemed = true;
        self.redeemed_by = Some(recipient.clone());
        self.redeemed_at = Some(now);
        Ok(())
    }
}

/// Renders a redemption link from a template containing `{gift_code}`.
pub fn render_gift_link(template: &str, code: &GiftCode) -> String {
    template.replace("{gift_code}", code.as_str())
}
