//! Gift ledger port.

use crate::domain::billing::{Entitlement, Gift, PremiumGrant, RedeemRejection};
use crate::domain::foundation::{DomainError, GiftCode, UserId};
use async_trait::async_trait;

/// Outcome of a redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// Code consumed and the recipient's entitlement updated.
    Redeemed { gift: Gift, entitlement: Entitlement },
    /// Nothing was changed.
    Rejected(RedeemRejection),
}

impl RedeemOutcome {
    pub fn is_redeemed(&self) -> bool {
        matches!(self, RedeemOutcome::Redeemed { .. })
    }
}

/// Repository port for gift codes.
#[async_trait]
pub trait GiftLedger: Send + Sync {
    /// Store a newly issued code. Issuing the same code twice is a no-op.
    async fn create(&self, gift: &Gift) -> Result<(), DomainError>;

    async fn get(&self, code: &GiftCode) -> Result<Option<Gift>, DomainError>;

    /// Make a code redeemable once its payment has succeeded. Inserts the
    /// gift if checkout never stored it. Repeating it is a no-op.
    async fn mark_paid(&self, gift: &Gift) -> Result<Gift, DomainError>;

    /// Mark the code redeemed and apply `grant` to the recipient as one
    /// transaction. Either both writes happen or neither does. Unpaid codes
    /// are rejected without changes.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the recipient has no entitlement row
    async fn redeem_and_grant(
        &self,
        code: &GiftCode,
        recipient: &UserId,
        grant: PremiumGrant,
    ) -> Result<RedeemOutcome, DomainError>;

    /// Gifts bought by a user, newest first.
    async fn list_by_sender(&self, sender: &UserId) -> Result<Vec<Gift>, DomainError>;
}
