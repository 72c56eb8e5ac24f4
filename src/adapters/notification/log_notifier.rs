use async_trait::async_trait;

use crate::domain::billing::BillingNotification;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::Notifier;

/// Notifier that only logs. Used when no relay URL is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        user_id: &UserId,
        notification: BillingNotification,
    ) -> Result<(), DomainError> {
        tracing::info!(
            user_id = %user_id,
            notification = notification.kind_name(),
            text = %notification.text(),
            "Billing notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notifier = LogNotifier::new();
        let result = notifier
            .notify(&UserId::new("1").unwrap(), BillingNotification::RenewalFailed)
            .await;
        assert!(result.is_ok());
    }
}
