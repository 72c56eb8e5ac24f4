//! Process-wide cap on in-flight gateway calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::domain::foundation::PaymentId;
use crate::ports::{CreatePaymentRequest, GatewayPayment, PaymentError, PaymentGateway};

/// Wraps a gateway so at most `max_in_flight` requests run at once.
///
/// Share one instance between request handlers and the renewal scheduler so
/// the cap holds across both.
#[derive(Clone)]
pub struct ConcurrencyLimitedGateway {
    inner: Arc<dyn PaymentGateway>,
    permits: Arc<Semaphore>,
}

impl ConcurrencyLimitedGateway {
    pub fn new(inner: Arc<dyn PaymentGateway>, max_in_flight: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>, PaymentError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| PaymentError::network("gateway limiter closed"))
    }
}

#[async_trait]
impl PaymentGateway for ConcurrencyLimitedGateway {
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<GatewayPayment, PaymentError> {
        let _permit = self.acquire().await?;
        self.inner.create_payment(request).await
    }

    async fn get_payment(&self, payment_id: &PaymentId) -> Result<GatewayPayment, PaymentError> {
        let _permit = self.acquire().await?;
        self.inner.get_payment(payment_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{Amount, PaymentStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Gateway that records peak concurrency.
    struct SlowGateway {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PaymentGateway for SlowGateway {
        async fn create_payment(
            &self,
            _request: CreatePaymentRequest,
        ) -> Result<GatewayPayment, PaymentError> {
            unreachable!()
        }

        async fn get_payment(&self, payment_id: &PaymentId) -> Result<GatewayPayment, PaymentError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(GatewayPayment {
                id: payment_id.clone(),
                status: PaymentStatus::Pending,
                amount: Amount::from_minor(100),
                currency: "RUB".to_string(),
                confirmation_url: None,
                instrument: None,
            })
        }
    }

    #[tokio::test]
    async fn in_flight_calls_never_exceed_cap() {
        let slow = Arc::new(SlowGateway {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let gateway = ConcurrencyLimitedGateway::new(slow.clone(), 2);

        let calls = (0..8).map(|i| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                let id = PaymentId::new(format!("p{}", i)).unwrap();
                gateway.get_payment(&id).await
            })
        });
        for call in futures::future::join_all(calls).await {
            assert!(call.unwrap().is_ok());
        }

        assert_eq!(slow.peak.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.available_permits(), 2);
    }

    #[test]
    fn zero_cap_is_raised_to_one() {
        let slow = Arc::new(SlowGateway {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        assert_eq!(ConcurrencyLimitedGateway::new(slow, 0).available_permits(), 1);
    }
}
