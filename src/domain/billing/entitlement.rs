//! Premium entitlement of a single user.
//!
//! The entitlement row is created on first contact and afterwards mutated only by
//! payment reconciliation, recurring billing, and gift redemption.
//!
//! # Expiry
//!
//! Expiry is detected lazily: a populated `premium_until` in the past means the
//! entitlement has lapsed even if `is_premium` is still set. Stores flip the flag
//! on the next `is_currently_premium` read.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// Display data captured from the front-end on each contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl UserProfile {
    pub fn new(username: Option<String>, first_name: Option<String>) -> Self {
        Self {
            username: username.as_deref().and_then(normalize_username),
            first_name: first_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }

    /// Best human-readable label, falling back to the raw user id.
    pub fn display_name(&self, user_id: &UserId) -> String {
        self.username
            .clone()
            .or_else(|| self.first_name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }
}

/// Canonical username form: trimmed, no leading `@`, lowercase.
pub fn normalize_username(raw: &str) -> Option<String> {
    let name = raw.trim().trim_start_matches('@').to_lowercase();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// How an entitlement should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "days", rename_all = "snake_case")]
pub enum PremiumGrant {
    /// Premium until `now + days`.
    Days(u32),
    /// Premium with no expiry.
    Permanent,
    /// Premium removed.
    Revoke,
}

impl PremiumGrant {
    /// Maps the `(active, days)` pair used by callers: positive days is a
    /// time-boxed grant, zero or negative days is permanent.
    pub fn from_flags(active: bool, days: i64) -> Self {
        match (active, days) {
            (false, _) => PremiumGrant::Revoke,
            (true, d) if d > 0 => PremiumGrant::Days(d.min(u32::MAX as i64) as u32),
            (true, _) => PremiumGrant::Permanent,
        }
    }

    /// Resulting `(is_premium, premium_until)` when applied at `now`.
    pub fn resolve(&self, now: Timestamp) -> (bool, Option<Timestamp>) {
        match self {
            PremiumGrant::Days(days) => (true, Some(now.add_days(*days as i64))),
            PremiumGrant::Permanent => (true, None),
            PremiumGrant::Revoke => (false, None),
        }
    }
}

/// Durable premium status of a user.
///
/// # Invariants
///
/// - `trial_used` is set at most once and never cleared
/// - `is_premium` with a past `premium_until` is a lapsed entitlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub user_id: UserId,
    pub profile: UserProfile,
    pub is_premium: bool,
    /// `None` means never granted, or permanent when `is_premium` is set.
    pub premium_until: Option<Timestamp>,
    pub trial_used: bool,
    /// Saved payment method enabling off-session renewal.
    pub instrument_ref: Option<String>,
    pub registered_at: Timestamp,
    pub last_activity: Timestamp,
}

impl Entitlement {
    /// A fresh, non-premium user.
    pub fn new(user_id: UserId, profile: UserProfile, now: Timestamp) -> Self {
        Self {
            user_id,
            profile,
            is_premium: false,
            premium_until: None,
            trial_used: false,
            instrument_ref: None,
            registered_at: now,
            last_activity: now,
        }
    }

    /// Whether premium applies at `now`, evaluating expiry.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.is_premium && self.premium_until.map_or(true, |until| until.is_after(&now))
    }

    /// Flag still set but the expiry has passed.
    pub fn has_lapsed_at(&self, now: Timestamp) -> bool {
        self.is_premium && self.premium_until.map_or(false, |until| !until.is_after(&now))
    }

    /// Lapsed with a saved instrument: a candidate for automatic renewal.
    pub fn is_due_for_renewal(&self, now: Timestamp) -> bool {
        self.has_lapsed_at(now) && self.instrument_ref.is_some()
    }

    /// Clears the premium flag if the entitlement has lapsed.
    ///
    /// Returns true when the flag was flipped.
    pub fn expire_if_lapsed(&mut self, now: Timestamp) -> bool {
        if self.has_lapsed_at(now) {
            self.is_premium = false;
            true
        } else {
            false
        }
    }

    pub fn apply_grant(&mut self, grant: PremiumGrant, now: Timestamp) {
        let (is_premium, until) = grant.resolve(now);
        self.is_premium = is_premium;
        self.premium_until = until;
    }

    /// Refreshes profile data and activity time on a repeat contact.
    pub fn touch(&mut self, profile: UserProfile, now: Timestamp) {
        if profile.username.is_some() {
            self.profile.username = profile.username;
        }
        if profile.first_name.is_some() {
            self.profile.first_name = profile.first_name;
        }
        self.last_activity = now;
    }

    pub fn has_auto_renewal(&self) -> bool {
        self.instrument_ref.is_some()
    }
}
