//! Axum router configuration for billing endpoints.
//!
//! This module defines the route structure for billing API endpoints
//! and wires them to their corresponding handlers.

use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    cancel_auto_renewal, create_checkout, create_gift, get_subscription, grant_premium,
    list_gifts, list_payments, payment_notification, payment_return, payment_status,
    redeem_gift, register_user, BillingAppState,
};

/// Create the front-end API router.
///
/// # Routes
///
/// ## User Endpoints
/// - `POST /users` - Register or refresh a user
/// - `GET /users/:user_id/subscription` - Subscription state
/// - `POST /users/:user_id/checkout` - Start a checkout
/// - `DELETE /users/:user_id/auto-renewal` - Stop automatic renewal
/// - `GET /users/:user_id/payments` - Payment history
/// - `GET /users/:user_id/gifts` - Gifts bought
///
/// ## Payment and Gift Endpoints
/// - `GET /payments/:payment_id/status` - Gateway status
/// - `POST /gifts` - Buy a gift
/// - `POST /gifts/:code/redeem` - Redeem a gift
///
/// ## Admin Endpoints
/// - `POST /admin/premium-grants` - Grant premium by username
pub fn api_routes() -> Router<BillingAppState> {
    Router::new()
        // User endpoints
        .route("/users", post(register_user))
        .route("/users/:user_id/subscription", get(get_subscription))
        .route("/users/:user_id/checkout", post(create_checkout))
        .route("/users/:user_id/auto-renewal", delete(cancel_auto_renewal))
        .route("/users/:user_id/payments", get(list_payments))
        .route("/users/:user_id/gifts", get(list_gifts))
        // Payment and gift endpoints
        .route("/payments/:payment_id/status", get(payment_status))
        .route("/gifts", post(create_gift))
        .route("/gifts/:code/redeem", post(redeem_gift))
        // Admin endpoints
        .route("/admin/premium-grants", post(grant_premium))
}

/// Create the gateway-facing router.
///
/// # Routes
/// - `POST /payment-notification` - Gateway callbacks
/// - `GET /payment-return` - Browser return after confirmation
pub fn gateway_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/payment-notification", post(payment_notification))
        .route("/payment-return", get(payment_return))
}

/// Create the complete billing router.
///
/// Gateway routes are mounted at the root, the front-end API at `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .merge(gateway_routes())
        .nest("/api", api_routes())
}

/// Build the servable application with request tracing and a timeout
/// bounding every request, webhook handling included.
pub fn billing_app(state: BillingAppState, request_timeout: Duration) -> Router {
    billing_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}
