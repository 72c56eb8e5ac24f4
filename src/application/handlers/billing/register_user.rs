//! RegisterUserHandler - Command handler for first contact and profile refresh.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Entitlement, UserProfile};
use crate::domain::foundation::UserId;
use crate::ports::EntitlementStore;

/// Command to register a user or refresh their profile.
#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub user_id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegisterUserResult {
    pub entitlement: Entitlement,
    /// Premium status after lazy expiry.
    pub is_premium: bool,
}

/// Creates the entitlement row on first contact; later contacts only refresh
/// profile data and activity time.
pub struct RegisterUserHandler {
    entitlements: Arc<dyn EntitlementStore>,
}

impl RegisterUserHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(&self, cmd: RegisterUserCommand) -> Result<RegisterUserResult, BillingError> {
        let profile = UserProfile::new(cmd.username, cmd.first_name);
        let entitlement = self
            .entitlements
            .upsert_new_user(&cmd.user_id, &profile)
            .await?;
        let is_premium = self.entitlements.is_currently_premium(&cmd.user_id).await?;

        tracing::debug!(user_id = %cmd.user_id, is_premium, "User contact recorded");

        Ok(RegisterUserResult {
            entitlement,
            is_premium,
        })
    }
}
