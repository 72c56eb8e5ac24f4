//! ListGiftsHandler - Query handler for gifts a user has bought.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Gift};
use crate::domain::foundation::UserId;
use crate::ports::GiftLedger;

#[derive(Debug, Clone)]
pub struct ListGiftsQuery {
    pub sender_id: UserId,
}

#[derive(Debug, Clone)]
pub struct ListGiftsResult {
    pub gifts: Vec<Gift>,
}

impl ListGiftsResult {
    pub fn redeemed_count(&self) -> usize {
        self.gifts.iter().filter(|g| g.is_redeemed).count()
    }
}

pub struct ListGiftsHandler {
    gifts: Arc<dyn GiftLedger>,
}

impl ListGiftsHandler {
    pub fn new(gifts: Arc<dyn GiftLedger>) -> Self {
        Self { gifts }
    }

    /// Paid gifts only. Codes reserved by an unfinished checkout stay hidden.
    pub async fn handle(&self, query: ListGiftsQuery) -> Result<ListGiftsResult, BillingError> {
        let gifts = self
            .gifts
            .list_by_sender(&query.sender_id)
            .await?
            .into_iter()
            .filter(|g| g.is_paid)
            .collect();
        Ok(ListGiftsResult { gifts })
    }
}
