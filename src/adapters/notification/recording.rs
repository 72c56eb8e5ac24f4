use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::billing::BillingNotification;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::Notifier;

/// In-memory notifier for tests. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<(UserId, BillingNotification)>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every subsequent delivery fail.
    pub fn fail_deliveries(&self, fail: bool) {
        self.state().fail = fail;
    }

    pub fn sent(&self) -> Vec<(UserId, BillingNotification)> {
        self.state().sent.clone()
    }

    pub fn sent_to(&self, user_id: &UserId) -> Vec<BillingNotification> {
        self.state()
            .sent
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn count_of(&self, kind_name: &str) -> usize {
        self.state()
            .sent
            .iter()
            .filter(|(_, n)| n.kind_name() == kind_name)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        user_id: &UserId,
        notification: BillingNotification,
    ) -> Result<(), DomainError> {
        let mut state = self.state();
        if state.fail {
            return Err(DomainError::new(ErrorCode::InternalError, "delivery failed"));
        }
        state.sent.push((user_id.clone(), notification));
        Ok(())
    }
}
