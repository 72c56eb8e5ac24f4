use async_trait::async_trait;

use crate::domain::billing::{user_not_found, Gift, PremiumGrant, RedeemRejection};
use crate::domain::foundation::{DomainError, GiftCode, Timestamp, UserId};
use crate::ports::{GiftLedger, RedeemOutcome};

use super::InMemoryBillingStore;

#[async_trait]
impl GiftLedger for InMemoryBillingStore {
    async fn create(&self, gift: &Gift) -> Result<(), DomainError> {
        let mut tables = self.tables.write().await;
        tables
            .gifts
            .entry(gift.code.clone())
            .or_insert_with(|| gift.clone());
        Ok(())
    }

    async fn get(&self, code: &GiftCode) -> Result<Option<Gift>, DomainError> {
        Ok(self.tables.read().await.gifts.get(code).cloned())
    }

    async fn mark_paid(&self, gift: &Gift) -> Result<Gift, DomainError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .gifts
            .entry(gift.code.clone())
            .or_insert_with(|| gift.clone());
        stored.mark_paid(gift.paid_at.unwrap_or_else(Timestamp::now));
        Ok(stored.clone())
    }

    async fn redeem_and_grant(
        &self,
        code: &GiftCode,
        recipient: &UserId,
        grant: PremiumGrant,
    ) -> Result<RedeemOutcome, DomainError> {
        let now = Timestamp::now();
        // Both tables are mutated under one write guard.
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let Some(gift) = tables.gifts.get_mut(code) else {
            return Ok(RedeemOutcome::Rejected(RedeemRejection::UnknownCode));
        };
        if let Err(rejection) = gift.check_redeemable_by(recipient) {
            return Ok(RedeemOutcome::Rejected(rejection));
        }
        let entitlement = tables
            .users
            .get_mut(recipient)
            .ok_or_else(|| user_not_found(recipient))?;

        if let Err(rejection) = gift.redeem(recipient, now) {
            return Ok(RedeemOutcome::Rejected(rejection));
        }
        entitlement.apply_grant(grant, now);

        Ok(RedeemOutcome::Redeemed {
            gift: gift.clone(),
            entitlement: entitlement.clone(),
        })
    }

    async fn list_by_sender(&self, sender: &UserId) -> Result<Vec<Gift>, DomainError> {
        let tables = self.tables.read().await;
        let mut gifts: Vec<Gift> = tables
            .gifts
            .values()
            .filter(|g| &g.sender_id == sender)
            .cloned()
            .collect();
        gifts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(gifts)
    }
}
