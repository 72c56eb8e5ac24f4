//! YooKassa API v3 request and response bodies.

use serde::{Deserialize, Serialize};

use crate::domain::billing::{Amount, PaymentStatus, ReportedInstrument};
use crate::domain::foundation::PaymentId;
use crate::ports::{CreatePaymentRequest, GatewayPayment, PaymentError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YooKassaAmount {
    /// Decimal string with two fraction digits, e.g. `"250.00"`.
    pub value: String,
    pub currency: String,
}

impl YooKassaAmount {
    pub fn new(amount: Amount, currency: &str) -> Self {
        Self {
            value: amount.to_decimal_string(),
            currency: currency.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YooKassaConfirmationRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub return_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YooKassaMetadata {
    pub user_id: String,
    pub payment_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YooKassaReceiptCustomer {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YooKassaReceiptItem {
    pub description: String,
    pub quantity: String,
    pub amount: YooKassaAmount,
    pub vat_code: u8,
    pub payment_mode: &'static str,
    pub payment_subject: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YooKassaReceipt {
    pub customer: YooKassaReceiptCustomer,
    pub items: Vec<YooKassaReceiptItem>,
}

/// Body of `POST /payments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YooKassaCreatePayment {
    pub amount: YooKassaAmount,
    pub capture: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<YooKassaConfirmationRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    pub save_payment_method: bool,
    pub description: String,
    pub metadata: YooKassaMetadata,
    pub merchant_customer_id: String,
    pub receipt: YooKassaReceipt,
}

impl YooKassaCreatePayment {
    /// Builds the wire body, attaching a fiscal receipt addressed to `receipt_email`.
    pub fn from_request(request: &CreatePaymentRequest, receipt_email: &str) -> Self {
        let amount = YooKassaAmount::new(request.amount, &request.currency);
        let confirmation = match (&request.instrument_ref, &request.return_url) {
            (None, Some(return_url)) => Some(YooKassaConfirmationRequest {
                kind: "redirect",
                return_url: return_url.clone(),
            }),
            _ => None,
        };

        Self {
            amount: amount.clone(),
            capture: true,
            confirmation,
            payment_method_id: request.instrument_ref.clone(),
            save_payment_method: request.save_instrument,
            description: request.description.clone(),
            metadata: YooKassaMetadata {
                user_id: request.user_id.to_string(),
                payment_type: request.kind.as_str().to_string(),
                gift_code: request.gift_code.as_ref().map(|c| c.to_string()),
            },
            merchant_customer_id: request.user_id.to_string(),
            receipt: YooKassaReceipt {
                customer: YooKassaReceiptCustomer {
                    email: receipt_email.to_string(),
                },
                items: vec![YooKassaReceiptItem {
                    description: request.description.clone(),
                    quantity: "1.00".to_string(),
                    amount,
                    vat_code: 1,
                    payment_mode: "full_prepayment",
                    payment_subject: "service",
                }],
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct YooKassaConfirmation {
    pub confirmation_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YooKassaPaymentMethod {
    pub id: Option<String>,
    #[serde(default)]
    pub saved: bool,
}

/// Payment object returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct YooKassaPayment {
    pub id: String,
    pub status: String,
    pub amount: YooKassaAmount,
    pub confirmation: Option<YooKassaConfirmation>,
    pub payment_method: Option<YooKassaPaymentMethod>,
}

impl YooKassaPayment {
    pub fn into_gateway_payment(self) -> Result<GatewayPayment, PaymentError> {
        let id = PaymentId::new(self.id)
            .map_err(|_| PaymentError::invalid_response("payment id is empty"))?;
        let status = self
            .status
            .parse::<PaymentStatus>()
            .map_err(|e| PaymentError::invalid_response(e.to_string()))?;
        let amount = self
            .amount
            .value
            .parse::<Amount>()
            .map_err(|e| PaymentError::invalid_response(e.to_string()))?;
        let instrument = self.payment_method.and_then(|pm| {
            pm.id.map(|id| ReportedInstrument {
                id,
                saved: pm.saved,
            })
        });

        Ok(GatewayPayment {
            id,
            status,
            amount,
            currency: self.amount.currency,
            confirmation_url: self.confirmation.and_then(|c| c.confirmation_url),
            instrument,
        })
    }
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct YooKassaErrorBody {
    pub code: Option<String>,
    pub description: Option<String>,
}
