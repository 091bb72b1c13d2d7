//! Time source injected into the outer shell (CLI, periodic sweep).
//!
//! Scheduler and tracker operations take `now` as an argument; only the
//! code that triggers them reads a clock.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, SchedulerError};

/// Longest day range a calendar or forecast query may span
pub const MAX_RANGE_DAYS: u32 = 3660;

pub fn check_day_range(days: u32) -> Result<()> {
    if days > MAX_RANGE_DAYS {
        return Err(SchedulerError::InvalidTimestamp(format!(
            "range of {} days exceeds the maximum of {}",
            days, MAX_RANGE_DAYS
        )));
    }
    Ok(())
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = *guard + by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_advance() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(4));
        assert_eq!(clock.now(), start + Duration::hours(4));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_day_range_bound() {
        assert!(check_day_range(0).is_ok());
        assert!(check_day_range(MAX_RANGE_DAYS).is_ok());
        assert!(matches!(
            check_day_range(MAX_RANGE_DAYS + 1),
            Err(SchedulerError::InvalidTimestamp(_))
        ));
    }
}
