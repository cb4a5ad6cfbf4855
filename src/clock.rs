//! # Injectable time source.
//!
//! Every policy decision takes an explicit `now`; the [`UpdateCoordinator`](crate::UpdateCoordinator)
//! obtains it from a [`Clock`]. Nothing in the core reads the wall clock directly.
//!
//! - [`SystemClock`] local wall-clock time (production).
//! - [`ManualClock`] fixed time that tests set or advance by hand.
//! - [`TokioClock`] a fixed anchor advanced by [`tokio::time::Instant`]; under a paused
//!   tokio runtime it follows the virtual time that sleeps and timeouts auto-advance.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, TimeDelta};

/// Source of the current, timezone-aware local time.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time in the device's local offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall-clock time in the host's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Frozen clock for tests. Only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.lock() = now;
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now = add_std(*now, by);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<FixedOffset>> {
        // A poisoned clock still holds a valid timestamp.
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.lock()
    }
}

/// Clock anchored at a fixed date-time that advances with tokio's monotonic clock.
///
/// Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct TokioClock {
    anchor: DateTime<FixedOffset>,
    started: tokio::time::Instant,
}

impl TokioClock {
    /// Creates a clock reading `anchor` right now.
    pub fn starting_at(anchor: DateTime<FixedOffset>) -> Self {
        Self {
            anchor,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<FixedOffset> {
        add_std(self.anchor, self.started.elapsed())
    }
}

/// Adds a std duration to a timestamp, saturating at chrono's representable range.
pub(crate) fn add_std(at: DateTime<FixedOffset>, by: Duration) -> DateTime<FixedOffset> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_manual_clock_is_frozen_until_advanced() {
        let clock = ManualClock::new(at("2024-01-15T10:00:00+00:00"));
        assert_eq!(clock.now(), clock.now());

        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), at("2024-01-15T10:01:30+00:00"));

        clock.set(at("2024-01-15T23:30:00+00:00"));
        assert_eq!(clock.now(), at("2024-01-15T23:30:00+00:00"));
    }

    #[test]
    fn test_manual_clock_keeps_offset() {
        let clock = ManualClock::new(at("2024-07-01T09:00:00+02:00"));
        clock.advance(Duration::from_secs(3600));
        let now = clock.now();
        assert_eq!(now.offset().local_minus_utc(), 7200);
        assert_eq!(now.format("%H:%M").to_string(), "10:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_virtual_time() {
        let clock = TokioClock::starting_at(at("2024-01-15T10:00:00+00:00"));
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(clock.now(), at("2024-01-15T10:05:00+00:00"));
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
