//! HTTP adapter for billing endpoints.
//!
//! Exposes the billing engine via REST API:
//! - `POST /payment-notification` - Gateway payment callbacks
//! - `GET /payment-return` - Browser return after checkout
//! - `/api/...` - Front-end JSON API (users, checkouts, gifts, admin grants)

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{BillingApiError, BillingAppState, BillingLinks};
pub use routes::{api_routes, billing_app, billing_router, gateway_routes};
