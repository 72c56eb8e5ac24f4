use async_trait::async_trait;

use crate::domain::billing::{
    normalize_username, user_not_found, Entitlement, PremiumGrant, UserProfile,
};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::EntitlementStore;

use super::InMemoryBillingStore;

#[async_trait]
impl EntitlementStore for InMemoryBillingStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Entitlement>, DomainError> {
        let Some(wanted) = normalize_username(username) else {
            return Ok(None);
        };
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|e| e.profile.username.as_deref() == Some(wanted.as_str()))
            .cloned())
    }

    async fn upsert_new_user(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<Entitlement, DomainError> {
        let now = Timestamp::now();
        let mut tables = self.tables.write().await;
        let entry = tables
            .users
            .entry(user_id.clone())
            .and_modify(|e| e.touch(profile.clone(), now))
            .or_insert_with(|| Entitlement::new(user_id.clone(), profile.clone(), now));
        Ok(entry.clone())
    }

    async fn set_premium(
        &self,
        user_id: &UserId,
        grant: PremiumGrant,
    ) -> Result<Entitlement, DomainError> {
        let mut tables = self.tables.write().await;
        let entitlement = tables
            .users
            .get_mut(user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        entitlement.apply_grant(grant, Timestamp::now());
        Ok(entitlement.clone())
    }

    async fn set_trial_used(&self, user_id: &UserId) -> Result<(), DomainError> {
        let mut tables = self.tables.write().await;
        let entitlement = tables
            .users
            .get_mut(user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        entitlement.trial_used = true;
        Ok(())
    }

    async fn save_instrument(
        &self,
        user_id: &UserId,
        instrument_ref: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut tables = self.tables.write().await;
        let entitlement = tables
            .users
            .get_mut(user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        entitlement.instrument_ref = instrument_ref.map(str::to_string);
        Ok(())
    }

    async fn is_currently_premium(&self, user_id: &UserId) -> Result<bool, DomainError> {
        let now = Timestamp::now();
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(user_id) {
            Some(entitlement) => {
                entitlement.expire_if_lapsed(now);
                Ok(entitlement.is_active_at(now))
            }
            None => Ok(false),
        }
    }

    async fn find_due_for_renewal(&self, now: Timestamp) -> Result<Vec<Entitlement>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|e| e.is_due_for_renewal(now))
            .cloned()
            .collect())
    }
}
