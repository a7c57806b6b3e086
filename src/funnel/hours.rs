//! Business-hours gate and the clock it reads.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Source of "now". Swapped for a fixed clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Advisor availability: weekdays 09:00–18:00, weekends 09:00–13:00, local time.
#[derive(Debug, Clone, Copy)]
pub struct BusinessHours {
    tz: Tz,
}

impl BusinessHours {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.tz);
        let hour = local.hour();
        match local.weekday() {
            Weekday::Sat | Weekday::Sun => (9..13).contains(&hour),
            _ => (9..18).contains(&hour),
        }
    }
}
