//! CancelAutoRenewalHandler - Command handler for removing the saved instrument.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::EntitlementStore;

#[derive(Debug, Clone)]
pub struct CancelAutoRenewalCommand {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAutoRenewalResult {
    /// Current premium keeps running until its expiry.
    pub is_premium: bool,
    pub premium_until: Option<Timestamp>,
}

/// Clears the saved payment method so the scheduler skips the user.
///
/// The current entitlement is not revoked; it runs out naturally.
pub struct CancelAutoRenewalHandler {
    entitlements: Arc<dyn EntitlementStore>,
}

impl CancelAutoRenewalHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(
        &self,
        cmd: CancelAutoRenewalCommand,
    ) -> Result<CancelAutoRenewalResult, BillingError> {
        let entitlement = self
            .entitlements
            .get(&cmd.user_id)
            .await?
            .ok_or_else(|| BillingError::UnknownUser(cmd.user_id.clone()))?;

        if !entitlement.has_auto_renewal() {
            return Err(BillingError::NoSavedInstrument(cmd.user_id));
        }

        self.entitlements.save_instrument(&cmd.user_id, None).await?;
        let is_premium = self.entitlements.is_currently_premium(&cmd.user_id).await?;

        tracing::info!(user_id = %cmd.user_id, "Auto-renewal cancelled");

        Ok(CancelAutoRenewalResult {
            is_premium,
            premium_until: entitlement.premium_until,
        })
    }
}
