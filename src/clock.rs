use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::RwLock;

/// Source of the current instant, injected so aggregation and cache expiry stay
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    instant: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: RwLock::new(instant),
        }
    }

    /// Midnight UTC of the given day. Falls back to the Unix epoch for an
    /// impossible date.
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let instant = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or(DateTime::UNIX_EPOCH);
        Self::new(instant)
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.instant.write().unwrap_or_else(|e| e.into_inner());
        *guard = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.instant.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.read().unwrap_or_else(|e| e.into_inner())
    }
}
