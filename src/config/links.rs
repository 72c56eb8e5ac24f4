//! Outbound links and the notification relay

use serde::Deserialize;

use super::error::ValidationError;
use super::gateway::is_http_url;

/// URLs handed to users or used to reach the messaging front-end.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinksConfig {
    /// e.g. `https://t.me/bot?start=gift_{gift_code}`
    pub gift_link_template: Option<String>,

    /// Target of `GET /payment-return`; plain "OK" when unset
    pub payment_return_redirect_url: Option<String>,

    /// Notifications are POSTed here when set, logged otherwise
    pub notification_relay_url: Option<String>,
}

impl LinksConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(template) = &self.gift_link_template {
            if !template.contains("{gift_code}") {
                return Err(ValidationError::MissingGiftCodePlaceholder);
            }
        }
        if let Some(url) = &self.payment_return_redirect_url {
            if !is_http_url(url) {
                return Err(ValidationError::InvalidUrl("links.payment_return_redirect_url"));
            }
        }
        if let Some(url) = &self.notification_relay_url {
            if !is_http_url(url) {
                return Err(ValidationError::InvalidUrl("links.notification_relay_url"));
            }
        }
        Ok(())
    }
}
