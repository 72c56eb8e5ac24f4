//! Notifier port - delivery of billing messages to users.
//!
//! The notification channel is an external collaborator. Delivery failures
//! are reported to the caller, which logs them; the engine never retries.

use crate::domain::billing::BillingNotification;
use crate::domain::foundation::{DomainError, UserId};
use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: &UserId,
        notification: BillingNotification,
    ) -> Result<(), DomainError>;
}

/// Sends a notification and logs a delivery failure instead of returning it.
pub async fn notify_best_effort(
    notifier: &dyn Notifier,
    user_id: &UserId,
    notification: BillingNotification,
) {
    let kind = notification.kind_name();
    if let Err(e) = notifier.notify(user_id, notification).await {
        tracing::warn!(
            user_id = %user_id,
            notification = kind,
            error = %e,
            "Failed to deliver billing notification"
        );
    }
}
