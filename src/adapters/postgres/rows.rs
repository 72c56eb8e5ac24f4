//! Row types shared by the billing repositories.

use chrono::{DateTime, Utc};

use crate::domain::billing::{Amount, Entitlement, Gift, PaymentKind, PaymentRecord, PaymentStatus, UserProfile};
use crate::domain::foundation::{DomainError, ErrorCode, GiftCode, PaymentId, Timestamp, UserId};

pub(super) const USER_COLUMNS: &str = "user_id, username, first_name, is_premium, premium_until, \
     trial_used, instrument_ref, registered_at, last_activity";

pub(super) const PAYMENT_COLUMNS: &str = "payment_id, user_id, kind, amount_minor, currency, status, \
     is_recurring, description, instrument_ref, created_at";

pub(super) const GIFT_COLUMNS: &str =
    "code, sender_id, is_paid, paid_at, is_redeemed, redeemed_by, created_at, redeemed_at";

/// Maps a sqlx failure to a database error with context.
pub(super) fn database_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

fn corrupt(column: &str, reason: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, reason),
    )
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    pub user_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub trial_used: bool,
    pub instrument_ref: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl TryFrom<UserRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Entitlement {
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("user_id", e))?,
            profile: UserProfile {
                username: row.username,
                first_name: row.first_name,
            },
            is_premium: row.is_premium,
            premium_until: row.premium_until.map(Timestamp::from_datetime),
            trial_used: row.trial_used,
            instrument_ref: row.instrument_ref,
            registered_at: Timestamp::from_datetime(row.registered_at),
            last_activity: Timestamp::from_datetime(row.last_activity),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PaymentRow {
    pub payment_id: String,
    pub user_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub is_recurring: bool,
    pub description: String,
    pub instrument_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentRecord {
            payment_id: PaymentId::new(row.payment_id).map_err(|e| corrupt("payment_id", e))?,
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("user_id", e))?,
            kind: parse_kind(&row.kind)?,
            amount: Amount::from_minor(row.amount_minor),
            currency: row.currency,
            status: parse_status(&row.status)?,
            is_recurring: row.is_recurring,
            description: row.description,
            instrument_ref: row.instrument_ref,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct GiftRow {
    pub code: String,
    pub sender_id: String,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_redeemed: bool,
    pub redeemed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl TryFrom<GiftRow> for Gift {
    type Error = DomainError;

    fn try_from(row: GiftRow) -> Result<Self, Self::Error> {
        Ok(Gift {
            code: GiftCode::parse(row.code).map_err(|e| corrupt("code", e))?,
            sender_id: UserId::new(row.sender_id).map_err(|e| corrupt("sender_id", e))?,
            is_paid: row.is_paid,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            is_redeemed: row.is_redeemed,
            redeemed_by: row
                .redeemed_by
                .map(UserId::new)
                .transpose()
                .map_err(|e| corrupt("redeemed_by", e))?,
            created_at: Timestamp::from_datetime(row.created_at),
            redeemed_at: row.redeemed_at.map(Timestamp::from_datetime),
        })
    }
}

pub(super) fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    s.parse::<PaymentStatus>().map_err(|e| corrupt("status", e))
}

pub(super) fn parse_kind(s: &str) -> Result<PaymentKind, DomainError> {
    s.parse::<PaymentKind>().map_err(|e| corrupt("kind", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_row(status: &str, kind: &str) -> PaymentRow {
        PaymentRow {
            payment_id: "p1".to_string(),
            user_id: "u1".to_string(),
            kind: kind.to_string(),
            amount_minor: 25_000,
            currency: "RUB".to_string(),
            status: status.to_string(),
            is_recurring: false,
            description: "Premium subscription for 30 days".to_string(),
            instrument_ref: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn parse_status_works_for_all_values() {
        assert_eq!(parse_status("pending").unwrap(), PaymentStatus::Pending);
        assert_eq!(
            parse_status("waiting_for_capture").unwrap(),
            PaymentStatus::WaitingForCapture
        );
        assert_eq!(parse_status("succeeded").unwrap(), PaymentStatus::Succeeded);
        assert_eq!(parse_status("canceled").unwrap(), PaymentStatus::Canceled);
    }

    #[test]
    fn parse_status_rejects_invalid_values() {
        assert!(parse_status("refunded").is_err());
        assert!(parse_status("").is_err());
    }

    #[test]
    fn payment_row_converts() {
        let record = PaymentRecord::try_from(payment_row("succeeded", "gift")).unwrap();
        assert_eq!(record.kind, PaymentKind::Gift);
        assert_eq!(record.amount, Amount::from_minor(25_000));
        assert_eq!(record.status, PaymentStatus::Succeeded);
    }

    #[test]
    fn corrupt_kind_is_database_error() {
        let err = PaymentRecord::try_from(payment_row("pending", "lifetime")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn gift_row_converts_redeemer() {
        let gift = Gift::try_from(GiftRow {
            code: "abc123".to_string(),
            sender_id: "s".to_string(),
            is_paid: true,
            paid_at: Some(Utc::now()),
            is_redeemed: true,
            redeemed_by: Some("r".to_string()),
            created_at: Utc::now(),
            redeemed_at: Some(Utc::now()),
        })
        .unwrap();
        assert_eq!(gift.redeemed_by, Some(UserId::new("r").unwrap()));
    }
}
