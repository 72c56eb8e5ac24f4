//! YooKassa payment gateway adapter.
//!
//! Implements the `PaymentGateway` port over the YooKassa REST API v3.
//!
//! # Security
//!
//! - Shop credentials are sent with HTTP basic auth and held as `SecretString`
//! - Each create call carries a fresh `Idempotence-Key`
//!
//! # Configuration
//!
//! ```ignore
//! let config = YooKassaConfig::new(shop_id, api_key)
//!     .with_receipt_email("billing@example.com");
//! let gateway = YooKassaGateway::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::PaymentId;
use crate::ports::{
    CreatePaymentRequest, GatewayPayment, PaymentError, PaymentErrorCode, PaymentGateway,
};

use super::api_types::{YooKassaCreatePayment, YooKassaErrorBody, YooKassaPayment};

pub const DEFAULT_BASE_URL: &str = "https://api.yookassa.ru/v3";

/// YooKassa API configuration.
#[derive(Clone)]
pub struct YooKassaConfig {
    shop_id: String,
    api_key: SecretString,
    base_url: String,
    /// Address put on fiscal receipts.
    receipt_email: String,
    request_timeout: Duration,
}

impl YooKassaConfig {
    pub fn new(shop_id: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            shop_id: shop_id.into(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            receipt_email: "user@example.com".to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_receipt_email(mut self, email: impl Into<String>) -> Self {
        self.receipt_email = email.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// YooKassa gateway adapter.
pub struct YooKassaGateway {
    config: YooKassaConfig,
    http_client: reqwest::Client,
}

impl YooKassaGateway {
    pub fn new(config: YooKassaConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    async fn parse_payment(response: reqwest::Response) -> Result<GatewayPayment, PaymentError> {
        let payment: YooKassaPayment = response.json().await.map_err(|e| {
            PaymentError::invalid_response(format!("Failed to parse YooKassa response: {}", e))
        })?;
        payment.into_gateway_payment()
    }

    async fn error_from_response(response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: Option<YooKassaErrorBody> = serde_json::from_str(&text).ok();
        let provider_code = body.as_ref().and_then(|b| b.code.clone());
        let detail = body
            .and_then(|b| b.description)
            .unwrap_or_else(|| text.clone());

        let error = map_status(status, &detail);
        match provider_code {
            Some(code) => error.with_provider_code(code),
            None => error,
        }
    }
}

/// Classifies a non-success HTTP status.
fn map_status(status: StatusCode, detail: &str) -> PaymentError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PaymentError::authentication(format!("YooKassa rejected credentials: {}", detail))
        }
        StatusCode::NOT_FOUND => PaymentError::not_found("Payment"),
        StatusCode::TOO_MANY_REQUESTS => PaymentError::new(
            PaymentErrorCode::RateLimitExceeded,
            format!("YooKassa rate limit: {}", detail),
        ),
        other => PaymentError::provider(
            other.as_u16(),
            format!("YooKassa API error ({}): {}", other.as_u16(), detail),
        ),
    }
}

#[async_trait]
impl PaymentGateway for YooKassaGateway {
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<GatewayPayment, PaymentError> {
        let url = format!("{}/payments", self.config.base_url);
        let body = YooKassaCreatePayment::from_request(&request, &self.config.receipt_email);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.shop_id, Some(self.config.api_key.expose_secret()))
            .header("Idempotence-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            let error = Self::error_from_response(response).await;
            tracing::error!(
                user_id = %request.user_id,
                payment_type = request.kind.as_str(),
                error = %error,
                "YooKassa create_payment failed"
            );
            return Err(error);
        }

        let payment = Self::parse_payment(response).await?;
        tracing::info!(
            payment_id = %payment.id,
            user_id = %request.user_id,
            payment_type = request.kind.as_str(),
            status = %payment.status,
            "YooKassa payment created"
        );
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &PaymentId) -> Result<GatewayPayment, PaymentError> {
        let url = format!("{}/payments/{}", self.config.base_url, payment_id);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.config.shop_id, Some(self.config.api_key.expose_secret()))
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Self::parse_payment(response).await
    }
}
