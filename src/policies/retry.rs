//! # Retry policy for failed forecast fetches.
//!
//! [`RetryPolicy`] tracks consecutive failures since the last success and turns
//! them into the next retry delay using a three-phase [`BackoffLadder`]:
//!
//! | Phase      | Interval | Attempts in phase | Failure count |
//! |------------|----------|-------------------|---------------|
//! | `Phase1`   | 1 min    | 5                 | 1–5           |
//! | `Phase2`   | 5 min    | 12                | 6–17          |
//! | `Phase3`   | 10 min   | unbounded         | 18+           |
//!
//! The phase is derived purely from the failure count, so a success followed by new
//! failures always restarts at `Phase1`. Once a streak has lasted longer than the
//! configured maximum retry duration the phase becomes [`RetryPhase::Failed`]: the
//! policy keeps handing out the last phase's interval, the flag is only for monitoring.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use chrono::DateTime;
//! use weatherbox::{BackoffLadder, RetryPhase, RetryPolicy};
//!
//! let now = DateTime::parse_from_rfc3339("2024-01-15T10:00:00+00:00").unwrap();
//! let mut policy = RetryPolicy::new(BackoffLadder::default(), Duration::from_secs(24 * 3600));
//!
//! assert_eq!(policy.record_failure(now), Duration::from_secs(60));
//! assert_eq!(policy.phase(), RetryPhase::Phase1);
//!
//! policy.record_success(now);
//! assert_eq!(policy.phase(), RetryPhase::Idle);
//! assert_eq!(policy.consecutive_failures(), 0);
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Where the retry state machine currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPhase {
    /// No failure since the last success (initial state).
    Idle,
    /// Short retries right after connectivity is lost.
    Phase1,
    /// Medium retries.
    Phase2,
    /// Long retries, unbounded.
    Phase3,
    /// The streak outlived the maximum retry duration. Retries continue.
    Failed,
}

impl RetryPhase {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryPhase::Idle => "idle",
            RetryPhase::Phase1 => "phase_1",
            RetryPhase::Phase2 => "phase_2",
            RetryPhase::Phase3 => "phase_3",
            RetryPhase::Failed => "failed",
        }
    }

    /// True for every phase that overrides the cadence interval.
    pub fn is_backoff(&self) -> bool {
        !matches!(self, RetryPhase::Idle)
    }
}

impl fmt::Display for RetryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// One bounded tier of the ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffStep {
    /// Delay between attempts while in this tier.
    pub interval: Duration,
    /// How many failures this tier absorbs before the next tier takes over.
    pub attempts: u32,
}

/// The three-phase backoff ladder.
///
/// Encapsulates:
/// - [`BackoffLadder::first`] short retries;
/// - [`BackoffLadder::second`] medium retries;
/// - [`BackoffLadder::last`] the unbounded final interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffLadder {
    /// Phase 1 tier.
    pub first: BackoffStep,
    /// Phase 2 tier.
    pub second: BackoffStep,
    /// Phase 3 interval, used for every failure past the first two tiers.
    pub last: Duration,
}

impl Default for BackoffLadder {
    /// Returns a ladder with:
    /// - `first = 1min × 5`;
    /// - `second = 5min × 12`;
    /// - `last = 10min`.
    fn default() -> Self {
        Self {
            first: BackoffStep {
                interval: Duration::from_secs(60),
                attempts: 5,
            },
            second: BackoffStep {
                interval: Duration::from_secs(5 * 60),
                attempts: 12,
            },
            last: Duration::from_secs(10 * 60),
        }
    }
}

impl BackoffLadder {
    /// Maps a cumulative failure count to its phase (`0` → [`RetryPhase::Idle`]).
    pub fn phase_for(&self, failures: u32) -> RetryPhase {
        let first_end = self.first.attempts;
        let second_end = first_end.saturating_add(self.second.attempts);

        match failures {
            0 => RetryPhase::Idle,
            n if n <= first_end => RetryPhase::Phase1,
            n if n <= second_end => RetryPhase::Phase2,
            _ => RetryPhase::Phase3,
        }
    }

    /// Retry interval for a phase; `None` for [`RetryPhase::Idle`].
    ///
    /// [`RetryPhase::Failed`] keeps the last (longest) interval.
    pub fn interval(&self, phase: RetryPhase) -> Option<Duration> {
        match phase {
            RetryPhase::Idle => None,
            RetryPhase::Phase1 => Some(self.first.interval),
            RetryPhase::Phase2 => Some(self.second.interval),
            RetryPhase::Phase3 | RetryPhase::Failed => Some(self.last),
        }
    }
}

/// Snapshot of the retry state machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RetryState {
    /// Current phase.
    pub phase: RetryPhase,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// When the current phase was entered (`None` before the first outcome).
    pub phase_entered_at: Option<DateTime<FixedOffset>>,
    /// When the current failure streak began (`None` while idle).
    pub streak_started_at: Option<DateTime<FixedOffset>>,
}

impl Default for RetryState {
    fn default() -> Self {
        Self {
            phase: RetryPhase::Idle,
            consecutive_failures: 0,
            phase_entered_at: None,
            streak_started_at: None,
        }
    }
}

/// Failure/backoff state machine for one fetch target.
///
/// ### Rules
/// - Mutated only through [`record_failure`](Self::record_failure) and
///   [`record_success`](Self::record_success); no I/O.
/// - Phases only move forward while failures continue.
/// - `Failed` is sticky until the next success.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    ladder: BackoffLadder,
    max_retry_duration: Duration,
    state: RetryState,
}

impl RetryPolicy {
    /// Creates an idle policy.
    pub fn new(ladder: BackoffLadder, max_retry_duration: Duration) -> Self {
        Self {
            ladder,
            max_retry_duration,
            state: RetryState::default(),
        }
    }

    /// Records a failed fetch at `now` and returns the delay before the next attempt.
    ///
    /// The returned interval belongs to the phase entered by this failure.
    pub fn record_failure(&mut self, now: DateTime<FixedOffset>) -> Duration {
        self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
        let started = *self.state.streak_started_at.get_or_insert(now);

        let phase = if self.state.phase == RetryPhase::Failed || self.streak_exceeded(started, now)
        {
            RetryPhase::Failed
        } else {
            self.ladder.phase_for(self.state.consecutive_failures)
        };

        if phase != self.state.phase {
            self.state.phase = phase;
            self.state.phase_entered_at = Some(now);
        }

        self.ladder.interval(phase).unwrap_or(self.ladder.last)
    }

    /// Records a successful fetch at `now`: back to [`RetryPhase::Idle`] with zero failures.
    pub fn record_success(&mut self, now: DateTime<FixedOffset>) {
        self.state = RetryState {
            phase: RetryPhase::Idle,
            consecutive_failures: 0,
            phase_entered_at: Some(now),
            streak_started_at: None,
        };
    }

    /// Current state snapshot.
    pub fn state(&self) -> &RetryState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> RetryPhase {
        self.state.phase
    }

    /// Failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.state.consecutive_failures
    }

    /// True once the streak has outlived the maximum retry duration.
    pub fn is_failed(&self) -> bool {
        self.state.phase == RetryPhase::Failed
    }

    /// Interval of the active backoff phase; `None` while idle.
    pub fn current_interval(&self) -> Option<Duration> {
        self.ladder.interval(self.state.phase)
    }

    /// The ladder this policy walks.
    pub fn ladder(&self) -> &BackoffLadder {
        &self.ladder
    }

    fn streak_exceeded(&self, started: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> bool {
        // A clock that stepped backwards yields a negative delta and never exhausts.
        (now - started)
            .to_std()
            .map(|elapsed| elapsed > self.max_retry_duration)
            .unwrap_or(false)
    }
}
