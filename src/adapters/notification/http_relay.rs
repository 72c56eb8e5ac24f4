//! Delivers notifications to the front-end relay over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::billing::BillingNotification;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::Notifier;

/// JSON body posted to the relay.
#[derive(Debug, Clone, Serialize)]
pub struct RelayMessage<'a> {
    pub user_id: &'a UserId,
    pub text: String,
    pub notification: &'a BillingNotification,
}

/// Posts `{user_id, text, notification}` to a configured URL.
pub struct HttpRelayNotifier {
    relay_url: String,
    http_client: reqwest::Client,
}

impl HttpRelayNotifier {
    pub fn new(relay_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::InternalError,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;
        Ok(Self {
            relay_url: relay_url.into(),
            http_client,
        })
    }
}

#[async_trait]
impl Notifier for HttpRelayNotifier {
    async fn notify(
        &self,
        user_id: &UserId,
        notification: BillingNotification,
    ) -> Result<(), DomainError> {
        let message = RelayMessage {
            user_id,
            text: notification.text(),
            notification: &notification,
        };

        let response = self
            .http_client
            .post(&self.relay_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::InternalError, format!("Relay unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Relay responded with {}", response.status()),
            ));
        }

        tracing::debug!(
            user_id = %user_id,
            notification = notification.kind_name(),
            "Notification relayed"
        );
        Ok(())
    }
}
