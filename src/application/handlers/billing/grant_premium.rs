//! GrantPremiumHandler - Operator command granting premium by username.

use std::sync::Arc;

use crate::domain::billing::{normalize_username, BillingError, BillingNotification, PremiumGrant};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{notify_best_effort, EntitlementStore, Notifier};

/// Durations an operator may grant.
pub const GRANTABLE_DAYS: [u32; 4] = [30, 90, 180, 365];

#[derive(Debug, Clone)]
pub struct GrantPremiumCommand {
    /// With or without a leading `@`.
    pub username: String,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantPremiumResult {
    pub user_id: UserId,
    pub premium_until: Option<Timestamp>,
}

pub struct GrantPremiumHandler {
    entitlements: Arc<dyn EntitlementStore>,
    notifier: Arc<dyn Notifier>,
}

impl GrantPremiumHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            entitlements,
            notifier,
        }
    }

    pub async fn handle(&self, cmd: GrantPremiumCommand) -> Result<GrantPremiumResult, BillingError> {
        if !GRANTABLE_DAYS.contains(&cmd.days) {
            return Err(BillingError::validation(
                "days",
                format!("must be one of {:?}", GRANTABLE_DAYS),
            ));
        }
        let username = normalize_username(&cmd.username)
            .ok_or_else(|| BillingError::validation("username", "cannot be empty"))?;

        let user = self
            .entitlements
            .find_by_username(&username)
            .await?
            .ok_or_else(|| BillingError::UnknownUsername(username.clone()))?;

        let entitlement = self
            .entitlements
            .set_premium(&user.user_id, PremiumGrant::Days(cmd.days))
            .await?;

        tracing::info!(
            user_id = %user.user_id,
            username = %username,
            days = cmd.days,
            "Premium granted by operator"
        );

        notify_best_effort(
            self.notifier.as_ref(),
            &user.user_id,
            BillingNotification::PremiumGranted {
                days: cmd.days,
                premium_until: entitlement.premium_until,
            },
        )
        .await;

        Ok(GrantPremiumResult {
            user_id: user.user_id,
            premium_until: entitlement.premium_until,
        })
    }
}
