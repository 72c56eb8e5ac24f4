//! Entitlement store port.
//!
//! Durable per-user premium status. Every mutation is a single atomic write at
//! the storage layer; concurrent writers on the same user resolve as last
//! writer wins.

use crate::domain::billing::{Entitlement, PremiumGrant, UserProfile};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use async_trait::async_trait;

/// Repository port for user entitlements.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Find a user's entitlement.
    async fn get(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError>;

    /// Find a user by username (case-insensitive, without `@`).
    async fn find_by_username(&self, username: &str) -> Result<Option<Entitlement>, DomainError>;

    /// Create the row on first contact, or refresh profile and activity.
    async fn upsert_new_user(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<Entitlement, DomainError>;

    /// Apply a premium grant, returning the updated row.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user has no row
    async fn set_premium(
        &self,
        user_id: &UserId,
        grant: PremiumGrant,
    ) -> Result<Entitlement, DomainError>;

    /// Mark the introductory trial as consumed. Idempotent.
    async fn set_trial_used(&self, user_id: &UserId) -> Result<(), DomainError>;

    /// Store or clear the saved payment instrument.
    async fn save_instrument(
        &self,
        user_id: &UserId,
        instrument_ref: Option<&str>,
    ) -> Result<(), DomainError>;

    /// Whether the user is premium right now.
    ///
    /// A lapsed entitlement has its flag cleared atomically before `false`
    /// is returned. Unknown users are not premium.
    async fn is_currently_premium(&self, user_id: &UserId) -> Result<bool, DomainError>;

    /// Lapsed premium rows holding a saved instrument.
    async fn find_due_for_renewal(&self, now: Timestamp) -> Result<Vec<Entitlement>, DomainError>;
}
