//! YooKassa payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for YooKassa, including:
//! - Redirect checkouts with fiscal receipts
//! - Off-session charges against saved payment methods
//! - Payment status lookup
//!
//! # Configuration
//!
//! Required settings (see `config::GatewayConfig`):
//! - `PREMIUM_BILLING__GATEWAY__SHOP_ID`
//! - `PREMIUM_BILLING__GATEWAY__API_KEY`

mod api_types;
mod limited_gateway;
mod mock_payment_gateway;
mod yookassa_adapter;

pub use api_types::{YooKassaAmount, YooKassaCreatePayment, YooKassaPayment};
pub use limited_gateway::ConcurrencyLimitedGateway;
pub use mock_payment_gateway::{MethodCall, MockPaymentGateway};
pub use yookassa_adapter::{YooKassaConfig, YooKassaGateway, DEFAULT_BASE_URL};
