//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Signed; negative when `other` is later.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Grant arithmetic. Negative values move backwards.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    pub fn minus_hours(&self, hours: i64) -> Self {
        Self(self.0 - Duration::hours(hours))
    }

    pub fn minus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 - Duration::minutes(minutes))
    }

    /// Complete days from `earlier` to `self`, rounded down; zero if already past.
    pub fn whole_days_after(&self, earlier: &Timestamp) -> i64 {
        self.duration_since(earlier).num_days().max(0)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M UTC"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use std::thread::sleep;

    #[test]
    fn timestamp_is_before_and_after_work_correctly() {
        let ts1 = Timestamp::now();
        sleep(std::time::Duration::from_millis(10));
        let ts2 = Timestamp::now();

        assert!(ts1.is_before(&ts2));
        assert!(ts2.is_after(&ts1));
        assert!(!ts2.is_before(&ts1));
    }

    #[test]
    fn add_days_moves_forward_and_backward() {
        let dt = DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ts = Timestamp::from_datetime(dt);

        assert_eq!(ts.add_days(30).as_datetime().month(), 2);
        assert_eq!(ts.add_days(-15).as_datetime().day(), 31);
        assert_eq!(ts.add_days(3).duration_since(&ts), Duration::days(3));
    }

    #[test]
    fn minus_hours_and_minutes_subtract() {
        let ts = Timestamp::now();
        assert_eq!(ts.duration_since(&ts.minus_hours(1)), Duration::hours(1));
        assert_eq!(ts.duration_since(&ts.minus_minutes(90)), Duration::minutes(90));
    }

    #[test]
    fn whole_days_after_rounds_down_and_floors_at_zero() {
        let now = Timestamp::now();
        assert_eq!(now.add_days(30).minus_minutes(1).whole_days_after(&now), 29);
        assert_eq!(now.add_days(3).whole_days_after(&now), 3);
        assert_eq!(now.minus_hours(5).whole_days_after(&now), 0);
    }

    #[test]
    fn timestamp_round_trips_through_json() {
        let json = "\"2024-01-15T10:30:00Z\"";
        let ts: Timestamp = serde_json::from_str(json).unwrap();

        assert_eq!(ts.as_datetime().year(), 2024);
        assert!(serde_json::to_string(&ts).unwrap().contains("2024-01-15"));
    }

    #[test]
    fn display_is_minute_precision_utc() {
        let dt = DateTime::parse_from_rfc3339("2024-01-15T10:30:59Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Timestamp::from_datetime(dt).to_string(), "2024-01-15 10:30 UTC");
    }
}
