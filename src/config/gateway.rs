//! Payment gateway (YooKassa) configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Credentials and limits for the YooKassa API.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub shop_id: String,

    /// Secret key used for HTTP basic auth
    #[serde(default = "empty_secret")]
    pub api_key: SecretString,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Where the gateway sends the browser after checkout
    #[serde(default)]
    pub return_url: String,

    /// Shared cap on in-flight gateway requests
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Customer address put on fiscal receipts
    #[serde(default = "default_receipt_email")]
    pub receipt_email: String,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `require_https` is set in production.
    pub fn validate(&self, require_https: bool) -> Result<(), ValidationError> {
        if self.shop_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__SHOP_ID"));
        }
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__API_KEY"));
        }
        if self.return_url.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__RETURN_URL"));
        }
        if !is_http_url(&self.base_url) {
            return Err(ValidationError::InvalidUrl("gateway.base_url"));
        }
        if !is_http_url(&self.return_url) {
            return Err(ValidationError::InvalidUrl("gateway.return_url"));
        }
        if require_https
            && (!self.base_url.starts_with("https://") || !self.return_url.starts_with("https://"))
        {
            return Err(ValidationError::GatewayMustBeHttps);
        }
        if self.max_concurrent_requests == 0 {
            return Err(ValidationError::MustBePositive(
                "gateway.max_concurrent_requests",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("gateway.request_timeout_secs"));
        }
        if !self.receipt_email.contains('@') {
            return Err(ValidationError::InvalidReceiptEmail);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            shop_id: String::new(),
            api_key: empty_secret(),
            base_url: default_base_url(),
            return_url: String::new(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_secs: default_request_timeout(),
            receipt_email: default_receipt_email(),
        }
    }
}

pub(super) fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_base_url() -> String {
    "https://api.yookassa.ru/v3".to_string()
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    15
}

fn default_receipt_email() -> String {
    "user@example.com".to_string()
}
