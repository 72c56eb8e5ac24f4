//! GetSubscriptionInfoHandler - Query handler for a user's subscription state.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::EntitlementStore;

#[derive(Debug, Clone)]
pub struct GetSubscriptionInfoQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSubscriptionInfoResult {
    pub user_id: UserId,
    pub is_premium: bool,
    pub premium_until: Option<Timestamp>,
    pub trial_used: bool,
    /// A payment method is saved for automatic renewal.
    pub auto_renewal: bool,
}

impl GetSubscriptionInfoResult {
    /// The introductory price is still on offer.
    pub fn trial_available(&self) -> bool {
        !self.trial_used
    }
}

/// Handler for reading subscription state.
///
/// Goes through the lazy-expiry read first so a lapsed entitlement is
/// reported (and stored) as inactive.
pub struct GetSubscriptionInfoHandler {
    entitlements: Arc<dyn EntitlementStore>,
}

impl GetSubscriptionInfoHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionInfoQuery,
    ) -> Result<GetSubscriptionInfoResult, BillingError> {
        let is_premium = self.entitlements.is_currently_premium(&query.user_id).await?;
        let entitlement = self
            .entitlements
            .get(&query.user_id)
            .await?
            .ok_or_else(|| BillingError::UnknownUser(query.user_id.clone()))?;

        Ok(GetSubscriptionInfoResult {
            user_id: query.user_id,
            is_premium,
            premium_until: entitlement.premium_until,
            trial_used: entitlement.trial_used,
            auto_renewal: entitlement.has_auto_renewal(),
        })
    }
}
