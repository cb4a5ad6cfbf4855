//! # Diagnostic events emitted by the update coordinator.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Cycle events**: one fetch/parse/render iteration (starting, fetched, failed, rendered, reported)
//! - **Retry events**: backoff phase transitions and the `FAILED` flag
//! - **Scheduling events**: next delay, coalesced late cycles, connectivity wake-ups
//! - **Runtime events**: shutdown and subscriber health
//!
//! The [`Event`] struct carries additional metadata such as the cycle number,
//! phase, delay and reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use weatherbox::{Event, EventKind, RetryPhase};
//!
//! let ev = Event::new(EventKind::FetchFailed)
//!     .with_cycle(3)
//!     .with_reason("connection refused")
//!     .with_phase(RetryPhase::Phase1);
//!
//! assert_eq!(ev.kind, EventKind::FetchFailed);
//! assert_eq!(ev.cycle, Some(3));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::policies::RetryPhase;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of diagnostic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Runtime events ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// The coordinator loop has exited.
    ///
    /// Sets:
    /// - `cycle`: number of cycles run
    CoordinatorStopped,

    // === Cycle events ===
    /// A fetch cycle is starting.
    ///
    /// Sets:
    /// - `cycle`: cycle number (1-based)
    /// - `phase`: retry phase going into the cycle
    CycleStarting,

    /// The fetch collaborator returned data.
    ///
    /// Sets:
    /// - `cycle`
    /// - `count`: raw periods received
    FetchSucceeded,

    /// The fetch failed (transport, malformed data or timeout).
    ///
    /// Also follows `FetchSucceeded` in the same cycle when the payload holds no
    /// usable periods.
    ///
    /// Sets:
    /// - `cycle`
    /// - `reason`: failure message
    FetchFailed,

    /// The fetch exceeded its timeout (always followed by `FetchFailed`).
    ///
    /// Sets:
    /// - `cycle`
    /// - `timeout_ms`: configured timeout
    TimeoutHit,

    /// A raw period was dropped during aggregation.
    ///
    /// Sets:
    /// - `cycle`
    /// - `count`: index of the period in the payload
    /// - `reason`: why it was dropped
    ObservationDropped,

    /// Daily summaries were handed to the renderer.
    ///
    /// Sets:
    /// - `cycle`
    /// - `count`: number of summaries
    SummariesRendered,

    /// The error signal was handed to the renderer.
    ///
    /// Sets:
    /// - `cycle`
    /// - `phase`: retry phase after the failure
    ErrorRendered,

    /// An error report was written to the diagnostics directory.
    ///
    /// Sets:
    /// - `cycle`
    /// - `reason`: path of the report
    DiagnosticsWritten,

    /// Writing the error report failed; the cycle is otherwise unaffected.
    ///
    /// Sets:
    /// - `cycle`
    /// - `reason`: I/O error message
    DiagnosticsFailed,

    // === Retry events ===
    /// The retry state machine entered a new phase.
    ///
    /// Sets:
    /// - `phase`: new phase
    /// - `previous_phase`: phase left
    /// - `failures`: consecutive failures
    PhaseChanged,

    /// The failure streak outlived the maximum retry duration (`FAILED` flag raised).
    ///
    /// Sets:
    /// - `failures`: consecutive failures
    /// - `reason`: last failure message
    RetryExhausted,

    /// A success ended a failure streak.
    ///
    /// Sets:
    /// - `failures`: length of the streak that ended
    RetryRecovered,

    // === Scheduling events ===
    /// Next attempt scheduled.
    ///
    /// Sets:
    /// - `cycle`: cycle that just finished
    /// - `delay_ms`: delay before the next attempt
    /// - `delay_source`: `Cadence` or `Backoff`
    NextFetchScheduled,

    /// The previous cycle overran its delay; the next one starts right away.
    ///
    /// Sets:
    /// - `cycle`: cycle that overran
    /// - `delay_ms`: how late the next cycle is
    CycleCoalesced,

    /// Connectivity was signaled restored; the remaining wait is abandoned.
    ConnectivityRestored,
}

/// What decided the delay before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelaySource {
    /// Day/night cadence (retry policy idle).
    Cadence,
    /// Backoff ladder (failure streak in progress).
    Backoff,
}

/// Diagnostic event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: timestamp; the wall clock at creation, replaced by the coordinator's clock on publish
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// When the event happened.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Cycle number (starting from 1).
    pub cycle: Option<u64>,
    /// Retry phase (current or newly entered).
    pub phase: Option<RetryPhase>,
    /// Phase left on a transition.
    pub previous_phase: Option<RetryPhase>,
    /// Consecutive failures.
    pub failures: Option<u32>,
    /// Kind-specific count (periods, summaries, index).
    pub count: Option<usize>,
    /// Delay in milliseconds.
    pub delay_ms: Option<u64>,
    /// Timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// What decided the delay.
    pub delay_source: Option<DelaySource>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Emitting component, for subscriber events.
    pub source: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            cycle: None,
            phase: None,
            previous_phase: None,
            failures: None,
            count: None,
            delay_ms: None,
            timeout_ms: None,
            delay_source: None,
            reason: None,
            source: None,
        }
    }

    /// Attaches a cycle number.
    #[inline]
    pub fn with_cycle(mut self, cycle: u64) -> Self {
        self.cycle = Some(cycle);
        self
    }

    /// Attaches a retry phase.
    #[inline]
    pub fn with_phase(mut self, phase: RetryPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches a phase transition.
    #[inline]
    pub fn with_transition(mut self, from: RetryPhase, to: RetryPhase) -> Self {
        self.previous_phase = Some(from);
        self.phase = Some(to);
        self
    }

    /// Attaches a consecutive failure count.
    #[inline]
    pub fn with_failures(mut self, failures: u32) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Attaches a kind-specific count.
    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis(d));
        self
    }

    /// Attaches a timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis(d));
        self
    }

    /// Marks the delay as cadence-driven.
    #[inline]
    pub fn with_cadence_delay(mut self) -> Self {
        self.delay_source = Some(DelaySource::Cadence);
        self
    }

    /// Marks the delay as backoff-driven.
    #[inline]
    pub fn with_backoff_delay(mut self) -> Self {
        self.delay_source = Some(DelaySource::Backoff);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the emitting component.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// Delay as a [`Duration`], if set.
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::CycleStarting);
        let b = Event::new(EventKind::CycleStarting);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders() {
        let ev = Event::new(EventKind::NextFetchScheduled)
            .with_cycle(7)
            .with_delay(Duration::from_secs(300))
            .with_cadence_delay();
        assert_eq!(ev.delay_ms, Some(300_000));
        assert_eq!(ev.delay(), Some(Duration::from_secs(300)));
        assert_eq!(ev.delay_source, Some(DelaySource::Cadence));

        let ev = Event::new(EventKind::PhaseChanged)
            .with_transition(RetryPhase::Phase1, RetryPhase::Phase2)
            .with_failures(6);
        assert_eq!(ev.previous_phase, Some(RetryPhase::Phase1));
        assert_eq!(ev.phase, Some(RetryPhase::Phase2));
    }

    #[test]
    fn test_subscriber_helpers() {
        let ev = Event::subscriber_overflow("log", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.source.as_deref(), Some("log"));
        assert_eq!(ev.reason.as_deref(), Some("full"));
    }
}
