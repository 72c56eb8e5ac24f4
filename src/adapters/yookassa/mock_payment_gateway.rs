//! Mock payment gateway for testing.
//!
//! Provides a configurable mock implementation of `PaymentGateway` for unit
//! and integration tests. Supports:
//! - Pre-configured responses
//! - Error injection
//! - Call tracking

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::billing::{PaymentStatus, ReportedInstrument};
use crate::domain::foundation::PaymentId;
use crate::ports::{CreatePaymentRequest, GatewayPayment, PaymentError, PaymentGateway};

/// Mock payment gateway for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentGateway::new();
///
/// // Recurring charges succeed immediately
/// mock.set_create_status(PaymentStatus::Succeeded);
///
/// // Inject errors
/// mock.set_method_error("create_payment", PaymentError::network("timeout"));
/// ```
#[derive(Default)]
pub struct MockPaymentGateway {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Payments created or registered, by id.
    payments: HashMap<PaymentId, GatewayPayment>,

    /// Responses queued for upcoming `create_payment` calls.
    queued: VecDeque<GatewayPayment>,

    /// Status given to generated payments (defaults to pending).
    create_status: Option<PaymentStatus>,

    /// Error to return on next call.
    next_error: Option<PaymentError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Requests passed to `create_payment`, in order.
    requests: Vec<CreatePaymentRequest>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    /// Create a new mock gateway with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not wedge the others.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Status assigned to payments generated by `create_payment`.
    pub fn set_create_status(&self, status: PaymentStatus) {
        self.state().create_status = Some(status);
    }

    /// Queue the exact response for the next `create_payment` call.
    pub fn push_payment(&self, payment: GatewayPayment) {
        self.state().queued.push_back(payment);
    }

    /// Register a payment returned by `get_payment`.
    pub fn add_payment(&self, payment: GatewayPayment) {
        self.state().payments.insert(payment.id.clone(), payment);
    }

    /// Change the status of a known payment.
    pub fn set_payment_status(&self, payment_id: &PaymentId, status: PaymentStatus) {
        if let Some(payment) = self.state().payments.get_mut(payment_id) {
            payment.status = status;
        }
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Requests received by `create_payment`.
    pub fn create_requests(&self) -> Vec<CreatePaymentRequest> {
        self.state().requests.clone()
    }

    pub fn last_create_request(&self) -> Option<CreatePaymentRequest> {
        self.state().requests.last().cloned()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        // Check method-specific error first
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // Check global error (consumes it)
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl Clone for MockPaymentGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Mock Implementations
// ════════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<GatewayPayment, PaymentError> {
        self.record_call(
            "create_payment",
            vec![request.user_id.to_string(), request.kind.to_string()],
        );
        self.check_error("create_payment")?;

        let mut state = self.state();
        state.requests.push(request.clone());

        let payment = match state.queued.pop_front() {
            Some(payment) => payment,
            None => {
                let id = PaymentId::new(format!("pay_mock_{}", Uuid::new_v4().simple()))
                    .map_err(|e| PaymentError::invalid_response(e.to_string()))?;
                let confirmation_url = request
                    .instrument_ref
                    .is_none()
                    .then(|| format!("https://checkout.mock/{}", id));
                GatewayPayment {
                    id,
                    status: state.create_status.unwrap_or(PaymentStatus::Pending),
                    amount: request.amount,
                    currency: request.currency.clone(),
                    confirmation_url,
                    instrument: request.instrument_ref.clone().map(|id| ReportedInstrument {
                        id,
                        saved: true,
                    }),
                }
            }
        };

        state.payments.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &PaymentId) -> Result<GatewayPayment, PaymentError> {
        self.record_call("get_payment", vec![payment_id.to_string()]);
        self.check_error("get_payment")?;

        self.state()
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("Payment"))
    }
}
