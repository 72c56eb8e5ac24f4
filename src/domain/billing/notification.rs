//! Inbound payment notifications from the gateway.
//!
//! The gateway posts an envelope shaped like:
//!
//! ```json
//! {
//!   "event": "payment.succeeded",
//!   "object": {
//!     "id": "2d7a...",
//!     "status": "succeeded",
//!     "amount": { "value": "250.00", "currency": "RUB" },
//!     "metadata": { "user_id": "42", "payment_type": "regular", "gift_code": null },
//!     "payment_method": { "id": "pm-1", "saved": true }
//!   }
//! }
//! ```
//!
//! Parsing is strict about the fields reconciliation needs and lenient about
//! everything else.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::foundation::{GiftCode, PaymentId, Timestamp, UserId};

use super::{
    Amount, BillingError, PaymentKind, PaymentRecord, PaymentStatus, DEFAULT_CURRENCY,
};

/// Event types that drive reconciliation.
pub const HANDLED_EVENTS: [&str; 3] = [
    "payment.waiting_for_capture",
    "payment.succeeded",
    "payment.canceled",
];

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    event: Option<String>,
    object: Option<RawPayment>,
}

#[derive(Debug, Deserialize)]
struct RawPayment {
    id: Option<String>,
    status: Option<String>,
    amount: Option<RawAmount>,
    metadata: Option<RawMetadata>,
    payment_method: Option<RawPaymentMethod>,
}

#[derive(Debug, Deserialize)]
struct RawAmount {
    value: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    // Gateways echo metadata back as strings, older clients sent numbers.
    user_id: Option<Value>,
    payment_type: Option<String>,
    gift_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPaymentMethod {
    id: Option<String>,
    #[serde(default)]
    saved: bool,
}

/// Payment method reported with a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedInstrument {
    pub id: String,
    /// Gateway confirmed the method can be charged again off-session.
    pub saved: bool,
}

/// A structurally valid payment event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub event: String,
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub amount: Option<Amount>,
    pub currency: Option<String>,
    pub user_id: UserId,
    pub kind: PaymentKind,
    pub gift_code: Option<GiftCode>,
    pub instrument: Option<ReportedInstrument>,
}

/// Result of parsing an inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedNotification {
    Payment(PaymentNotification),
    /// Well-formed envelope for an event type this engine does not act on.
    Ignored { event: String },
}

impl PaymentNotification {
    /// Parses and validates a raw request body.
    pub fn parse(body: &[u8]) -> Result<ParsedNotification, BillingError> {
        let raw: RawEnvelope = serde_json::from_slice(body)
            .map_err(|e| BillingError::malformed(format!("invalid JSON: {}", e)))?;

        let event = raw
            .event
            .filter(|e| !e.is_empty())
            .ok_or_else(|| BillingError::malformed("missing 'event'"))?;

        if !HANDLED_EVENTS.contains(&event.as_str()) {
            return Ok(ParsedNotification::Ignored { event });
        }

        let object = raw
            .object
            .ok_or_else(|| BillingError::malformed("missing 'object'"))?;

        let payment_id = object
            .id
            .ok_or_else(|| BillingError::malformed("missing 'object.id'"))
            .and_then(|id| PaymentId::new(id).map_err(|e| BillingError::malformed(e.to_string())))?;

        let status = object
            .status
            .ok_or_else(|| BillingError::malformed("missing 'object.status'"))?
            .parse::<PaymentStatus>()
            .map_err(|e| BillingError::malformed(e.to_string()))?;

        let metadata = object
            .metadata
            .ok_or_else(|| BillingError::malformed("missing 'object.metadata'"))?;

        let user_id = match metadata.user_id {
            Some(Value::String(s)) => UserId::new(s).ok(),
            Some(Value::Number(n)) => UserId::new(n.to_string()).ok(),
            _ => None,
        }
        .ok_or_else(|| BillingError::malformed("missing 'metadata.user_id'"))?;

        let kind = metadata
            .payment_type
            .ok_or_else(|| BillingError::malformed("missing 'metadata.payment_type'"))?
            .parse::<PaymentKind>()
            .map_err(|e| BillingError::malformed(e.to_string()))?;

        let gift_code = match metadata.gift_code.filter(|c| !c.trim().is_empty()) {
            Some(code) => Some(
                GiftCode::parse(code).map_err(|e| BillingError::malformed(e.to_string()))?,
            ),
            None => None,
        };

        let (amount, currency) = match object.amount {
            Some(raw) => (
                raw.value.and_then(|v| v.parse::<Amount>().ok()),
                raw.currency.filter(|c| !c.is_empty()),
            ),
            None => (None, None),
        };

        let instrument = object.payment_method.and_then(|pm| {
            pm.id.filter(|id| !id.is_empty()).map(|id| ReportedInstrument {
                id,
                saved: pm.saved,
            })
        });

        Ok(ParsedNotification::Payment(PaymentNotification {
            event,
            payment_id,
            status,
            amount,
            currency,
            user_id,
            kind,
            gift_code,
            instrument,
        }))
    }

    /// Builds the ledger row for a payment the ledger has not seen yet.
    ///
    /// The row starts as pending so the reconciler performs the
    /// transition to the reported status itself.
    pub fn to_record(&self, now: Timestamp) -> PaymentRecord {
        let policy = self.kind.policy();
        PaymentRecord {
            payment_id: self.payment_id.clone(),
            user_id: self.user_id.clone(),
            kind: self.kind,
            amount: self.amount.unwrap_or(policy.amount),
            currency: self
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            status: PaymentStatus::Pending,
            is_recurring: self.kind == PaymentKind::Recurring,
            description: policy.description.to_string(),
            instrument_ref: self.instrument.as_ref().map(|i| i.id.clone()),
            created_at: now,
        }
    }

    /// Instrument id to store for renewals, if the gateway saved one.
    pub fn saved_instrument(&self) -> Option<&str> {
        self.instrument
            .as_ref()
            .filter(|i| i.saved)
            .map(|i| i.id.as_str())
    }
}
