//! # Update-loop health tracker with sequence-based ordering.
//!
//! Maintains a queryable view of the coordinator's health (retry phase,
//! failure streak, `FAILED` flag, last outcome) derived purely from events.
//!
//! ## Architecture
//! ```text
//! UpdateCoordinator ──► Bus ──► listener ──► SubscriberSet ──► HealthTracker::update()
//!                                                                     │
//!                                                                     ▼
//!                                                              HealthSnapshot
//! ```
//!
//! ## Rules
//! - Events with `seq <= last_seq` are **rejected** (stale)
//! - Read operations (`snapshot`, `is_failed`) are **eventually consistent**

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::policies::RetryPhase;
use crate::subscribers::Subscribe;

/// Point-in-time view of the update loop.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    /// Last seen retry phase.
    pub phase: RetryPhase,
    /// Consecutive failures in the current streak.
    pub consecutive_failures: u32,
    /// Whether the `FAILED` flag is raised.
    pub failed: bool,
    /// Cycles started so far.
    pub cycles: u64,
    /// Time of the last rendered summaries, read from the coordinator's clock.
    pub last_success_at: Option<SystemTime>,
    /// Message of the most recent failure in the current streak.
    pub last_error: Option<Arc<str>>,
    /// Sequence number of the last applied event.
    pub last_seq: Option<u64>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            phase: RetryPhase::Idle,
            consecutive_failures: 0,
            failed: false,
            cycles: 0,
            last_success_at: None,
            last_error: None,
            last_seq: None,
        }
    }
}

/// Thread-safe health tracker; also a [`Subscribe`] implementation.
///
/// Share it via `Arc` with the coordinator builder and keep a clone to query.
#[derive(Default)]
pub struct HealthTracker {
    state: RwLock<HealthSnapshot>,
}

impl HealthTracker {
    /// Creates a new tracker in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event if it is newer than the last one seen.
    ///
    /// Returns `true` when the health view changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let mut s = self.state.write().await;
        if s.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        s.last_seq = Some(ev.seq);

        match ev.kind {
            EventKind::CycleStarting => {
                s.cycles = ev.cycle.unwrap_or(s.cycles + 1);
                true
            }
            EventKind::FetchFailed => {
                s.last_error = ev.reason.clone();
                true
            }
            EventKind::PhaseChanged => {
                if let Some(phase) = ev.phase {
                    s.phase = phase;
                }
                if let Some(n) = ev.failures {
                    s.consecutive_failures = n;
                }
                true
            }
            EventKind::ErrorRendered => {
                if let Some(phase) = ev.phase {
                    s.phase = phase;
                }
                if let Some(n) = ev.failures {
                    s.consecutive_failures = n;
                }
                true
            }
            EventKind::RetryExhausted => {
                s.failed = true;
                s.phase = RetryPhase::Failed;
                true
            }
            EventKind::SummariesRendered => {
                s.phase = RetryPhase::Idle;
                s.consecutive_failures = 0;
                s.failed = false;
                s.last_error = None;
                s.last_success_at = Some(ev.at);
                true
            }
            _ => false,
        }
    }

    /// Returns a copy of the current health view.
    pub async fn snapshot(&self) -> HealthSnapshot {
        self.state.read().await.clone()
    }

    /// Returns true if the `FAILED` flag is raised.
    pub async fn is_failed(&self) -> bool {
        self.state.read().await.failed
    }
}

#[async_trait]
impl Subscribe for HealthTracker {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "health"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failure_streak_then_recovery() {
        let tracker = HealthTracker::new();
        tracker
            .update(&Event::new(EventKind::CycleStarting).with_cycle(1))
            .await;
        tracker
            .update(&Event::new(EventKind::FetchFailed).with_reason("offline"))
            .await;
        tracker
            .update(
                &Event::new(EventKind::PhaseChanged)
                    .with_transition(RetryPhase::Idle, RetryPhase::Phase1)
                    .with_failures(1),
            )
            .await;

        let snap = tracker.snapshot().await;
        assert_eq!(snap.cycles, 1);
        assert_eq!(snap.phase, RetryPhase::Phase1);
        assert_eq!(snap.consecutive_failures, 1);
        assert_eq!(snap.last_error.as_deref(), Some("offline"));
        assert!(snap.last_success_at.is_none());

        tracker
            .update(&Event::new(EventKind::SummariesRendered).with_count(5))
            .await;
        let snap = tracker.snapshot().await;
        assert_eq!(snap.phase, RetryPhase::Idle);
        assert_eq!(snap.consecutive_failures, 0);
        assert!(snap.last_error.is_none());
        assert!(snap.last_success_at.is_some());
    }

    #[tokio::test]
    async fn test_exhausted_raises_flag() {
        let tracker = HealthTracker::new();
        tracker
            .update(&Event::new(EventKind::RetryExhausted).with_failures(145))
            .await;
        assert!(tracker.is_failed().await);
        assert_eq!(tracker.snapshot().await.phase, RetryPhase::Failed);
    }

    #[tokio::test]
    async fn test_stale_events_rejected() {
        let tracker = HealthTracker::new();
        let older = Event::new(EventKind::RetryExhausted);
        let newer = Event::new(EventKind::SummariesRendered);

        assert!(tracker.update(&newer).await);
        assert!(!tracker.update(&older).await);
        assert!(!tracker.is_failed().await);
    }
}
