//! Time sources used for timestamps, recency and retention.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used to simulate ageing.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.write() = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock};
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn manual_clock_advances() {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("date");
        let clock = ManualClock::new(start);
        clock.advance(Duration::days(2));
        assert_eq!(clock.now(), start + Duration::days(2));
    }
}
