//! # Day/night update cadence.
//!
//! [`CadencePolicy`] maps the current local time to the base fetch interval used
//! while the [`RetryPolicy`](crate::RetryPolicy) is idle:
//!
//! ```text
//! day_start ≤ local_time(now) < day_end  → day_interval   (default 5 min)
//! otherwise                              → night_interval (default 60 min)
//! ```
//!
//! Stateless; evaluated on every scheduling decision so a day/night boundary is
//! never missed.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime};

/// Read-only cadence configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CadenceWindow {
    /// Start of the daytime window (inclusive).
    pub day_start: NaiveTime,
    /// End of the daytime window (exclusive).
    pub day_end: NaiveTime,
    /// Fetch interval during the day.
    pub day_interval: Duration,
    /// Fetch interval during the night.
    pub night_interval: Duration,
}

impl Default for CadenceWindow {
    /// Returns a window with:
    /// - `day = [06:00, 23:00)`;
    /// - `day_interval = 5min`;
    /// - `night_interval = 60min`.
    fn default() -> Self {
        Self {
            day_start: hm(6, 0),
            day_end: hm(23, 0),
            day_interval: Duration::from_secs(5 * 60),
            night_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// Base interval policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct CadencePolicy {
    window: CadenceWindow,
}

impl CadencePolicy {
    /// Creates a policy over `window` (validated by [`Config`](crate::Config)).
    pub fn new(window: CadenceWindow) -> Self {
        Self { window }
    }

    /// True when `now`'s local time lies in `[day_start, day_end)`.
    pub fn is_daytime(&self, now: DateTime<FixedOffset>) -> bool {
        let local = now.time();
        self.window.day_start <= local && local < self.window.day_end
    }

    /// Base fetch interval at `now`.
    pub fn interval_for(&self, now: DateTime<FixedOffset>) -> Duration {
        if self.is_daytime(now) {
            self.window.day_interval
        } else {
            self.window.night_interval
        }
    }

    /// The configured window.
    pub fn window(&self) -> &CadenceWindow {
        &self.window
    }
}

pub(crate) fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
