//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Opaque identifier of an end user, as issued by the front-end platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Payment identifier assigned by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    /// Creates a new PaymentId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("payment_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// High-entropy redeemable gift code (128 random bits, lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GiftCode(String);

impl GiftCode {
    /// Generates a fresh random code.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parses a code received from a user or a gateway callback.
    ///
    /// Accepts only ASCII alphanumerics so codes can be embedded in deep links.
    pub fn parse(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::empty_field("gift_code"));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::invalid_format(
                "gift_code",
                "must contain only letters and digits",
            ));
        }
        Ok(Self(code.to_ascii_lowercase()))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Payload of the front-end deep link that redeems this code.
    pub fn deep_link_payload(&self) -> String {
        format!("gift_{}", self.0)
    }
}

impl fmt::Display for GiftCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_non_empty_string() {
        let id = UserId::new("768903494").unwrap();
        assert_eq!(id.as_str(), "768903494");
    }

    #[test]
    fn user_id_rejects_blank_string() {
        let result = UserId::new("   ");
        match result {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "user_id"),
            _ => panic!("Expected EmptyField error"),
        }
    }

    #[test]
    fn payment_id_rejects_empty_string() {
        assert!(PaymentId::new("").is_err());
        assert_eq!(PaymentId::new("2d7a-0001").unwrap().to_string(), "2d7a-0001");
    }

    #[test]
    fn generated_gift_codes_are_32_hex_chars_and_distinct() {
        let a = GiftCode::generate();
        let b = GiftCode::generate();

        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn gift_code_parse_normalizes_case_and_whitespace() {
        let code = GiftCode::parse("  ABCdef0123 ").unwrap();
        assert_eq!(code.as_str(), "abcdef0123");
    }

    #[test]
    fn gift_code_parse_rejects_link_unsafe_characters() {
        assert!(GiftCode::parse("abc/../def").is_err());
        assert!(GiftCode::parse("").is_err());
    }

    #[test]
    fn gift_code_deep_link_payload_is_prefixed() {
        let code = GiftCode::parse("abc123").unwrap();
        assert_eq!(code.deep_link_payload(), "gift_abc123");
    }
}
