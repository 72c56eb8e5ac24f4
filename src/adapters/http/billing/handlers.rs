//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use http::StatusCode;

use crate::application::handlers::billing::{
    CancelAutoRenewalCommand, CancelAutoRenewalHandler, CreateCheckoutCommand,
    CreateCheckoutHandler, CreateGiftCommand, CreateGiftHandler, GetSubscriptionInfoHandler,
    GetSubscriptionInfoQuery, GrantPremiumCommand, GrantPremiumHandler,
    HandlePaymentNotificationCommand, HandlePaymentNotificationHandler, ListGiftsHandler,
    ListGiftsQuery, ListPaymentsHandler, ListPaymentsQuery, NotificationOutcome,
    QueryPaymentStatusHandler, QueryPaymentStatusQuery, RedeemGiftCommand, RedeemGiftHandler,
    RegisterUserCommand, RegisterUserHandler,
};
use crate::domain::billing::{BillingError, PaymentKind, UserProfile};
use crate::domain::foundation::{DomainError, GiftCode, PaymentId, UserId};
use crate::ports::{EntitlementStore, GiftLedger, Notifier, PaymentGateway, PaymentLedger};

use super::dto::{
    AutoRenewalResponse, CheckoutRequest, CheckoutResponse, CreateGiftRequest, ErrorResponse,
    GiftListResponse, GrantPremiumRequest, GrantPremiumResponse, PaymentListResponse,
    PaymentResponse, PaymentStatusResponse, RedeemGiftRequest, RedeemGiftResponse,
    RegisterUserRequest, SubscriptionResponse, UserResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped dependencies
/// for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub entitlements: Arc<dyn EntitlementStore>,
    pub payments: Arc<dyn PaymentLedger>,
    pub gifts: Arc<dyn GiftLedger>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub links: BillingLinks,
}

/// URLs the billing endpoints hand out.
#[derive(Debug, Clone, Default)]
pub struct BillingLinks {
    /// Where the gateway sends the browser after confirmation.
    pub checkout_return_url: Option<String>,
    /// `{gift_code}` is replaced with the code.
    pub gift_link_template: Option<String>,
    /// Target of `GET /payment-return`.
    pub payment_return_redirect_url: Option<String>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn register_user_handler(&self) -> RegisterUserHandler {
        RegisterUserHandler::new(self.entitlements.clone())
    }

    pub fn subscription_info_handler(&self) -> GetSubscriptionInfoHandler {
        GetSubscriptionInfoHandler::new(self.entitlements.clone())
    }

    pub fn checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.entitlements.clone(),
            self.payments.clone(),
            self.gateway.clone(),
            self.links.checkout_return_url.clone(),
        )
    }

    pub fn create_gift_handler(&self) -> CreateGiftHandler {
        CreateGiftHandler::new(
            self.entitlements.clone(),
            self.gifts.clone(),
            Arc::new(self.checkout_handler()),
        )
    }

    pub fn cancel_auto_renewal_handler(&self) -> CancelAutoRenewalHandler {
        CancelAutoRenewalHandler::new(self.entitlements.clone())
    }

    pub fn list_payments_handler(&self) -> ListPaymentsHandler {
        ListPaymentsHandler::new(self.payments.clone())
    }

    pub fn payment_status_handler(&self) -> QueryPaymentStatusHandler {
        QueryPaymentStatusHandler::new(self.payments.clone(), self.gateway.clone())
    }

    pub fn redeem_gift_handler(&self) -> RedeemGiftHandler {
        RedeemGiftHandler::new(
            self.entitlements.clone(),
            self.gifts.clone(),
            self.notifier.clone(),
        )
    }

    pub fn list_gifts_handler(&self) -> ListGiftsHandler {
        ListGiftsHandler::new(self.gifts.clone())
    }

    pub fn grant_premium_handler(&self) -> GrantPremiumHandler {
        GrantPremiumHandler::new(self.entitlements.clone(), self.notifier.clone())
    }

    pub fn notification_handler(&self) -> HandlePaymentNotificationHandler {
        HandlePaymentNotificationHandler::new(
            self.entitlements.clone(),
            self.payments.clone(),
            self.gifts.clone(),
            self.notifier.clone(),
            self.links.gift_link_template.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Gateway Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payment-notification - Reconcile a gateway callback
///
/// 200 for any well-formed notification, whatever its business outcome.
/// 400 stops redelivery of malformed payloads; 500 asks for redelivery.
pub async fn payment_notification(
    State(state): State<BillingAppState>,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.notification_handler();
    let cmd = HandlePaymentNotificationCommand {
        body: body.to_vec(),
    };

    let outcome = handler.handle(cmd).await?;
    if let NotificationOutcome::UnknownUser {
        payment_id,
        user_id,
    } = &outcome
    {
        tracing::warn!(
            payment_id = %payment_id,
            user_id = %user_id,
            "Acknowledged notification for unknown user"
        );
    }

    Ok(StatusCode::OK)
}

/// GET /payment-return - Browser lands here after confirming a payment
pub async fn payment_return(State(state): State<BillingAppState>) -> Response {
    match &state.links.payment_return_redirect_url {
        Some(url) => Redirect::to(url).into_response(),
        None => (StatusCode::OK, "OK").into_response(),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/users - Register a user or refresh their profile
pub async fn register_user(
    State(state): State<BillingAppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = RegisterUserCommand {
        user_id: UserId::new(request.user_id).map_err(BillingError::from)?,
        username: request.username,
        first_name: request.first_name,
    };

    let result = state.register_user_handler().handle(cmd).await?;
    Ok(Json(UserResponse::from(result)))
}

/// GET /api/users/:user_id/subscription - Subscription state with lazy expiry
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let query = GetSubscriptionInfoQuery {
        user_id: parse_user_id(user_id)?,
    };

    let result = state.subscription_info_handler().handle(query).await?;
    Ok(Json(SubscriptionResponse::from(result)))
}

/// POST /api/users/:user_id/checkout - Start a checkout
pub async fn create_checkout(
    State(state): State<BillingAppState>,
    Path(user_id): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let user_id = parse_user_id(user_id)?;

    // Gift checkouts need a code issued first
    let checkout = if request.kind == PaymentKind::Gift {
        state
            .create_gift_handler()
            .handle(CreateGiftCommand { sender_id: user_id })
            .await?
            .checkout
    } else {
        state
            .checkout_handler()
            .handle(CreateCheckoutCommand {
                user_id,
                kind: request.kind,
                gift_code: None,
            })
            .await?
    };

    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(checkout))))
}

/// DELETE /api/users/:user_id/auto-renewal - Stop automatic renewal
pub async fn cancel_auto_renewal(
    State(state): State<BillingAppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = CancelAutoRenewalCommand {
        user_id: parse_user_id(user_id)?,
    };

    let result = state.cancel_auto_renewal_handler().handle(cmd).await?;
    Ok(Json(AutoRenewalResponse::from(result)))
}

/// GET /api/users/:user_id/payments - Payment history, newest first
pub async fn list_payments(
    State(state): State<BillingAppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let query = ListPaymentsQuery {
        user_id: parse_user_id(user_id)?,
    };

    let result = state.list_payments_handler().handle(query).await?;
    Ok(Json(PaymentListResponse {
        payments: result.payments.into_iter().map(PaymentResponse::from).collect(),
    }))
}

/// GET /api/users/:user_id/gifts - Gifts bought by the user
pub async fn list_gifts(
    State(state): State<BillingAppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let query = ListGiftsQuery {
        sender_id: parse_user_id(user_id)?,
    };

    let result = state.list_gifts_handler().handle(query).await?;
    Ok(Json(GiftListResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Payment and Gift Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/payments/:payment_id/status - Status as reported by the gateway
pub async fn payment_status(
    State(state): State<BillingAppState>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let query = QueryPaymentStatusQuery {
        payment_id: PaymentId::new(payment_id).map_err(BillingError::from)?,
    };

    let result = state.payment_status_handler().handle(query).await?;
    Ok(Json(PaymentStatusResponse::from(result)))
}

/// POST /api/gifts - Buy a gift subscription
pub async fn create_gift(
    State(state): State<BillingAppState>,
    Json(request): Json<CreateGiftRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = CreateGiftCommand {
        sender_id: parse_user_id(request.sender_id)?,
    };

    let result = state.create_gift_handler().handle(cmd).await?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(result.checkout))))
}

/// POST /api/gifts/:code/redeem - Redeem a gift code
pub async fn redeem_gift(
    State(state): State<BillingAppState>,
    Path(code): Path<String>,
    Json(request): Json<RedeemGiftRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = RedeemGiftCommand {
        code: GiftCode::parse(code).map_err(BillingError::from)?,
        recipient_id: parse_user_id(request.recipient_id)?,
        profile: UserProfile::new(request.username, request.first_name),
    };

    let result = state.redeem_gift_handler().handle(cmd).await?;
    Ok(Json(RedeemGiftResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/premium-grants - Operator grant by username
pub async fn grant_premium(
    State(state): State<BillingAppState>,
    Json(request): Json<GrantPremiumRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = GrantPremiumCommand {
        username: request.username,
        days: request.days,
    };

    let result = state.grant_premium_handler().handle(cmd).await?;
    Ok(Json(GrantPremiumResponse::from(result)))
}

fn parse_user_id(raw: String) -> Result<UserId, BillingApiError> {
    UserId::new(raw).map_err(|e| BillingApiError(BillingError::from(e)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(pub BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self(BillingError::from(err))
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            BillingError::Gateway { .. } => (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR"),
            BillingError::MalformedEvent(_) => (StatusCode::BAD_REQUEST, "MALFORMED_EVENT"),
            BillingError::UnknownUser(_) | BillingError::UnknownUsername(_) => {
                (StatusCode::NOT_FOUND, "USER_NOT_FOUND")
            }
            BillingError::PaymentNotFound(_) => (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND"),
            BillingError::NoSavedInstrument(_) => (StatusCode::CONFLICT, "NO_SAVED_INSTRUMENT"),
            BillingError::ValidationFailed { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED")
            }
            BillingError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Billing request failed");
        }

        let body = ErrorResponse::new(error_code, self.0.message());
        (status, Json(body)).into_response()
    }
}
