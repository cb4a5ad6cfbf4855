//! # UpdateCoordinator: the single authority over "when is the next fetch".
//!
//! Owns the [`RetryPolicy`] by value, asks the [`CadencePolicy`] for the base
//! interval, runs one fetch-parse-render cycle at a time, and feeds outcomes back
//! into the retry state machine.
//!
//! ## Cycle
//! ```text
//! now ──► CadencePolicy::interval_for(now) ───────────────────────────────┐ base
//!   │                                                                     │
//!   └──► fetch_once(timeout) ──► Ok(periods) ──► PeriodAggregator          │
//!              │                                   ├─ summaries ≠ ∅ ──► record_success ──► render() ──► delay = base
//!              │                                   └─ summaries = ∅ ──┐
//!              └──► Err(timeout/transport/malformed) ─────────────────┴─► record_failure ──► render_error() ──► delay = backoff
//! ```
//!
//! ## Scheduling
//! ```text
//! run(token):
//!   loop {
//!     start = Instant::now()
//!     report = run_cycle()                (never interrupted mid-fetch)
//!     deadline = start + report.delay
//!     deadline passed?  → publish CycleCoalesced, next cycle now (once, not queued)
//!     succeeded?        → forget signals raised during the fetch
//!     select! {
//!        token.cancelled()       → stop
//!        sleep_until(deadline)   → next cycle
//!        connectivity restored   → publish ConnectivityRestored, next cycle
//!     }
//!   }
//!   publish CoordinatorStopped, drain subscribers
//! ```
//!
//! ## Rules
//! - `run_cycle` takes `&mut self`: at most one cycle is ever in flight.
//! - While the retry policy is in a backoff phase, the backoff interval replaces the
//!   cadence interval entirely; cadence governs only while idle.
//! - A connectivity signal shortens the wait but never resets the retry state.
//! - A signal raised while a fetch is in flight is kept if that fetch fails, so the
//!   retry starts as soon as the fetch returns; after a success it is discarded.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, add_std};
use crate::coordinator::builder::CoordinatorBuilder;
use crate::coordinator::collaborators::{self, Connectivity, FetchRef, RenderRef};
use crate::coordinator::diagnostics::{DiagnosticsWriter, ErrorReport};
use crate::coordinator::runner;
use crate::error::FetchError;
use crate::events::{Bus, DelaySource, Event, EventKind};
use crate::forecast::{Aggregation, DailySummary, Period, PeriodAggregator};
use crate::policies::{CadencePolicy, RetryPhase, RetryPolicy, RetryState};
use crate::{Config, shutdown};

/// What a cycle ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Summaries were handed to the renderer.
    Rendered {
        /// Number of daily summaries.
        days: usize,
        /// Periods dropped during aggregation.
        dropped: usize,
    },
    /// The cycle failed and the error signal was rendered.
    Failed(FetchError),
}

impl CycleOutcome {
    /// True for [`CycleOutcome::Rendered`].
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Rendered { .. })
    }
}

/// Result of one fetch-parse-render cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Cycle number (starting from 1).
    pub cycle: u64,
    /// Clock time the cycle started at.
    pub started_at: DateTime<FixedOffset>,
    /// How the cycle ended.
    pub outcome: CycleOutcome,
    /// Delay before the next cycle, measured from `started_at`.
    pub delay: Duration,
    /// What decided `delay`.
    pub delay_source: DelaySource,
    /// Retry phase after the cycle.
    pub phase: RetryPhase,
    /// Consecutive failures after the cycle.
    pub consecutive_failures: u32,
}

impl CycleReport {
    /// Clock time the next cycle is due.
    pub fn next_fetch_at(&self) -> DateTime<FixedOffset> {
        add_std(self.started_at, self.delay)
    }
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorStatus {
    /// Cycles run so far.
    pub cycles: u64,
    /// Retry state machine snapshot.
    pub retry: RetryState,
    /// When the next cycle is due, once one has run.
    pub next_fetch_at: Option<DateTime<FixedOffset>>,
    /// Report of the most recent cycle.
    pub last: Option<CycleReport>,
    /// Summaries handed to the renderer by the last successful cycle.
    pub last_forecast: Option<Vec<DailySummary>>,
}

/// Drives fetch cycles and owns all scheduling state.
///
/// Built with [`UpdateCoordinator::builder`]. Must be built inside a tokio runtime.
pub struct UpdateCoordinator {
    cadence: CadencePolicy,
    retry: RetryPolicy,
    aggregator: PeriodAggregator,
    fetch_timeout: Duration,
    diagnostics: Option<DiagnosticsWriter>,

    clock: Arc<dyn Clock>,
    fetcher: FetchRef,
    renderer: RenderRef,

    bus: Bus,
    connectivity: Connectivity,
    restored: watch::Receiver<u64>,

    cycles: u64,
    last: Option<CycleReport>,
    last_forecast: Option<Vec<DailySummary>>,

    listener_stop: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

/// How a wait between cycles ended.
enum Wake {
    Elapsed,
    Restored,
    Cancelled,
}

impl UpdateCoordinator {
    /// Starts building a coordinator from `cfg`.
    pub fn builder(cfg: Config) -> CoordinatorBuilder {
        CoordinatorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: &Config,
        clock: Arc<dyn Clock>,
        fetcher: FetchRef,
        renderer: RenderRef,
        bus: Bus,
        listener_stop: CancellationToken,
        listener: JoinHandle<()>,
    ) -> Self {
        let connectivity = Connectivity::new();
        let restored = connectivity.watch();
        Self {
            cadence: CadencePolicy::new(cfg.cadence),
            retry: RetryPolicy::new(cfg.backoff, cfg.max_retry_duration),
            aggregator: PeriodAggregator::new(cfg.buckets),
            fetch_timeout: cfg.fetch_timeout,
            diagnostics: cfg.diagnostics_dir.clone().map(DiagnosticsWriter::new),
            clock,
            fetcher,
            renderer,
            bus,
            connectivity,
            restored,
            cycles: 0,
            last: None,
            last_forecast: None,
            listener_stop,
            listener: Some(listener),
        }
    }

    /// Handle for signaling "connectivity restored".
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity.clone()
    }

    /// Receiver observing every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Retry state machine snapshot.
    pub fn retry_state(&self) -> &RetryState {
        self.retry.state()
    }

    /// Summaries shown by the last successful cycle.
    pub fn last_forecast(&self) -> Option<&[DailySummary]> {
        self.last_forecast.as_deref()
    }

    /// Current status, including when the next cycle is due.
    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            cycles: self.cycles,
            retry: self.retry.state().clone(),
            next_fetch_at: self.last.as_ref().map(CycleReport::next_fetch_at),
            last: self.last.clone(),
            last_forecast: self.last_forecast.clone(),
        }
    }

    /// Runs one fetch-parse-render cycle and returns the chosen next delay.
    ///
    /// Never fails: every error is folded into the retry state.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let cycle = self.cycles;
        let started_at = self.clock.now();
        let base = self.cadence.interval_for(started_at);

        self.bus.publish(
            Event::new(EventKind::CycleStarting)
                .with_cycle(cycle)
                .with_phase(self.retry.phase()),
        );

        let fetched =
            runner::fetch_once(self.fetcher.as_ref(), self.fetch_timeout, cycle, &self.bus).await;
        let finished_at = self.clock.now();

        let aggregated = fetched.and_then(|periods| self.aggregate(cycle, &periods));

        let (outcome, delay, delay_source) = match aggregated {
            Ok(agg) => {
                self.on_success(finished_at);
                self.renderer.render(&agg.summaries);
                self.bus.publish(
                    Event::new(EventKind::SummariesRendered)
                        .with_cycle(cycle)
                        .with_count(agg.summaries.len()),
                );
                let outcome = CycleOutcome::Rendered {
                    days: agg.summaries.len(),
                    dropped: agg.dropped.len(),
                };
                self.last_forecast = Some(agg.summaries);
                (outcome, base, DelaySource::Cadence)
            }
            Err(err) => {
                let delay = self.on_failure(cycle, finished_at, &err);
                self.write_report(cycle, finished_at, &err).await;
                (CycleOutcome::Failed(err), delay, DelaySource::Backoff)
            }
        };

        let scheduled = Event::new(EventKind::NextFetchScheduled)
            .with_cycle(cycle)
            .with_delay(delay);
        self.bus.publish(match delay_source {
            DelaySource::Cadence => scheduled.with_cadence_delay(),
            DelaySource::Backoff => scheduled.with_backoff_delay(),
        });

        let report = CycleReport {
            cycle,
            started_at,
            outcome,
            delay,
            delay_source,
            phase: self.retry.phase(),
            consecutive_failures: self.retry.consecutive_failures(),
        };
        self.last = Some(report.clone());
        report
    }

    /// Runs cycles until `token` is cancelled; returns the number of cycles run.
    ///
    /// Cancellation is observed between cycles only; an in-flight fetch is bounded
    /// by the fetch timeout.
    pub async fn run(mut self, token: CancellationToken) -> u64 {
        while !token.is_cancelled() {
            let started = Instant::now();
            self.restored.borrow_and_update();
            let report = self.run_cycle().await;
            let deadline = started + report.delay;

            let now = Instant::now();
            if deadline <= now {
                self.bus.publish(
                    Event::new(EventKind::CycleCoalesced)
                        .with_cycle(report.cycle)
                        .with_delay(now - deadline),
                );
                continue;
            }

            if report.outcome.is_success() {
                self.restored.borrow_and_update();
            }
            let wake = tokio::select! {
                _ = token.cancelled() => Wake::Cancelled,
                _ = time::sleep_until(deadline) => Wake::Elapsed,
                _ = collaborators::restored(&mut self.restored) => Wake::Restored,
            };
            match wake {
                Wake::Elapsed => {}
                Wake::Restored => self.bus.publish(Event::new(EventKind::ConnectivityRestored)),
                Wake::Cancelled => break,
            }
        }

        self.bus
            .publish(Event::new(EventKind::CoordinatorStopped).with_cycle(self.cycles));
        self.listener_stop.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
        self.cycles
    }

    /// Runs until SIGINT/SIGTERM/SIGQUIT (Ctrl-C on non-unix).
    ///
    /// Returns the number of cycles run, or an error if signal handlers cannot be installed.
    pub async fn run_until_signal(self) -> std::io::Result<u64> {
        let token = CancellationToken::new();
        let bus = self.bus.clone();

        let run = self.run(token.clone());
        tokio::pin!(run);

        tokio::select! {
            cycles = &mut run => return Ok(cycles),
            sig = shutdown::wait_for_shutdown_signal() => {
                sig?;
                bus.publish(Event::new(EventKind::ShutdownRequested));
                token.cancel();
            }
        }
        Ok(run.await)
    }

    /// Aggregates raw periods; no usable summary at all counts as a malformed response.
    fn aggregate(
        &self,
        cycle: u64,
        periods: &[Period],
    ) -> Result<Aggregation, FetchError> {
        let agg = self.aggregator.aggregate(periods);
        for dropped in &agg.dropped {
            self.bus.publish(
                Event::new(EventKind::ObservationDropped)
                    .with_cycle(cycle)
                    .with_count(dropped.index)
                    .with_reason(dropped.error.to_string()),
            );
        }
        if agg.summaries.is_empty() {
            let err = FetchError::malformed(format!(
                "no usable observations in {} periods",
                periods.len()
            ));
            runner::publish_failed(&self.bus, cycle, &err);
            return Err(err);
        }
        Ok(agg)
    }

    fn on_success(&mut self, now: DateTime<FixedOffset>) {
        let before = self.retry.phase();
        let failures = self.retry.consecutive_failures();
        self.retry.record_success(now);

        if before != RetryPhase::Idle {
            self.bus.publish(
                Event::new(EventKind::PhaseChanged)
                    .with_transition(before, RetryPhase::Idle)
                    .with_failures(0),
            );
        }
        if failures > 0 {
            self.bus
                .publish(Event::new(EventKind::RetryRecovered).with_failures(failures));
        }
    }

    fn on_failure(&mut self, cycle: u64, now: DateTime<FixedOffset>, err: &FetchError) -> Duration {
        let before = self.retry.phase();
        let delay = self.retry.record_failure(now);
        let after = self.retry.phase();
        let failures = self.retry.consecutive_failures();

        if after != before {
            self.bus.publish(
                Event::new(EventKind::PhaseChanged)
                    .with_transition(before, after)
                    .with_failures(failures),
            );
            if after == RetryPhase::Failed {
                self.bus.publish(
                    Event::new(EventKind::RetryExhausted)
                        .with_failures(failures)
                        .with_reason(err.to_string()),
                );
            }
        }

        self.renderer.render_error(self.retry.state());
        self.bus.publish(
            Event::new(EventKind::ErrorRendered)
                .with_cycle(cycle)
                .with_phase(after)
                .with_failures(failures),
        );
        delay
    }

    /// Writes an error report if a diagnostics directory is configured.
    async fn write_report(&self, cycle: u64, now: DateTime<FixedOffset>, err: &FetchError) {
        let Some(writer) = &self.diagnostics else {
            return;
        };
        let report = ErrorReport::new(
            now,
            cycle,
            err,
            self.retry.state(),
            self.last_forecast.as_deref(),
        );
        let ev = match writer.write(&report).await {
            Ok(path) => Event::new(EventKind::DiagnosticsWritten)
                .with_reason(path.display().to_string()),
            Err(e) => Event::new(EventKind::DiagnosticsFailed).with_reason(e.to_string()),
        };
        self.bus.publish(ev.with_cycle(cycle));
    }
}

impl Drop for UpdateCoordinator {
    fn drop(&mut self) {
        self.listener_stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::adapters::{CaptureRenderer, Frame};
    use crate::clock::{ManualClock, TokioClock};
    use crate::coordinator::Fetch;
    use crate::forecast::Period;

    const MINUTE: Duration = Duration::from_secs(60);

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, h, m, 0)
            .unwrap()
    }

    fn forecast() -> Vec<Period> {
        vec![
            Period::new("2024-06-01T09:00:00+00:00", "Clear", 15),
            Period::new("2024-06-01T12:00:00+00:00", "Clear", 14),
            Period::new("2024-06-01T15:00:00+00:00", "Cloudy", 12),
            Period::new("2024-06-01T21:00:00+00:00", "Rainy", 9),
        ]
    }

    /// Replays scripted outcomes; every call beyond the script succeeds.
    struct Scripted {
        script: Mutex<VecDeque<Result<Vec<Period>, FetchError>>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        latency: Duration,
    }

    impl Scripted {
        fn new(script: Vec<Result<Vec<Period>, FetchError>>) -> Arc<Self> {
            Self::slow(script, Duration::ZERO)
        }

        fn slow(script: Vec<Result<Vec<Period>, FetchError>>, latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                latency,
            })
        }
    }

    #[async_trait]
    impl Fetch for Scripted {
        async fn fetch(&self) -> Result<Vec<Period>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.latency.is_zero() {
                time::sleep(self.latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(forecast()))
        }
    }

    fn offline() -> Result<Vec<Period>, FetchError> {
        Err(FetchError::transport("offline"))
    }

    fn coordinator(
        cfg: Config,
        clock: Arc<dyn Clock>,
        fetch: Arc<Scripted>,
        capture: &CaptureRenderer,
    ) -> UpdateCoordinator {
        UpdateCoordinator::builder(cfg)
            .with_clock(clock)
            .build(fetch, Arc::new(capture.clone()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_six_failures_then_success_resets_to_cadence() {
        let clock = Arc::new(ManualClock::new(at(23, 30)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::new(vec![offline(); 6]);
        let mut coord = coordinator(Config::default(), clock.clone(), fetch, &capture);

        let mut delays = Vec::new();
        for _ in 0..6 {
            let report = coord.run_cycle().await;
            assert_eq!(report.delay_source, DelaySource::Backoff);
            clock.advance(report.delay);
            delays.push(report.delay);
        }
        assert_eq!(
            delays,
            vec![MINUTE, MINUTE, MINUTE, MINUTE, MINUTE, 5 * MINUTE]
        );
        assert_eq!(coord.retry_state().phase, RetryPhase::Phase2);

        // 23:30 + 10 min is still night: the cadence interval is an hour.
        let report = coord.run_cycle().await;
        assert!(report.outcome.is_success());
        assert_eq!(report.delay_source, DelaySource::Cadence);
        assert_eq!(report.delay, 60 * MINUTE);
        assert_eq!(report.phase, RetryPhase::Idle);
        assert_eq!(report.consecutive_failures, 0);

        let frames = capture.frames();
        assert_eq!(frames.len(), 7);
        assert!(matches!(frames[5], Frame::Error { consecutive_failures: 6, .. }));
        assert!(matches!(frames[6], Frame::Summaries { ref days } if days.len() == 1));
    }

    #[tokio::test]
    async fn test_backoff_overrides_daytime_cadence() {
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::new(vec![Ok(forecast()), offline()]);
        let mut coord = coordinator(Config::default(), clock, fetch, &capture);

        assert_eq!(coord.run_cycle().await.delay, 5 * MINUTE);
        let report = coord.run_cycle().await;
        assert_eq!(report.delay, MINUTE);
        assert_eq!(report.delay_source, DelaySource::Backoff);
    }

    #[tokio::test]
    async fn test_unusable_payload_counts_as_failure() {
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let capture = CaptureRenderer::new();
        let garbage = vec![Period {
            timestamp: Some("yesterday".into()),
            category: Some("Clear".into()),
            value: Some(3),
        }];
        let fetch = Scripted::new(vec![Ok(garbage), Ok(Vec::new())]);
        let mut coord = coordinator(Config::default(), clock, fetch, &capture);
        let mut rx = coord.subscribe();

        let report = coord.run_cycle().await;
        assert!(matches!(report.outcome, CycleOutcome::Failed(FetchError::Malformed { .. })));
        assert_eq!(report.consecutive_failures, 1);

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ObservationDropped));
        assert!(!kinds.contains(&EventKind::SummariesRendered));
        // The transfer succeeded; aggregation then rejected the payload.
        let transfer: Vec<EventKind> = kinds
            .iter()
            .copied()
            .filter(|k| matches!(k, EventKind::FetchSucceeded | EventKind::FetchFailed))
            .collect();
        assert_eq!(transfer, vec![EventKind::FetchSucceeded, EventKind::FetchFailed]);

        let report = coord.run_cycle().await;
        assert!(!report.outcome.is_success());
        assert_eq!(report.consecutive_failures, 2);
        assert_eq!(capture.frames().len(), 2);
    }

    #[tokio::test]
    async fn test_events_report_phase_changes_and_recovery() {
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::new(vec![offline()]);
        let mut coord = coordinator(Config::default(), clock, fetch, &capture);
        let mut rx = coord.subscribe();

        coord.run_cycle().await;
        coord.run_cycle().await;

        let events: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let changes: Vec<(Option<RetryPhase>, Option<RetryPhase>)> = events
            .iter()
            .filter(|e| e.kind == EventKind::PhaseChanged)
            .map(|e| (e.previous_phase, e.phase))
            .collect();
        assert_eq!(
            changes,
            vec![
                (Some(RetryPhase::Idle), Some(RetryPhase::Phase1)),
                (Some(RetryPhase::Phase1), Some(RetryPhase::Idle)),
            ]
        );
        let recovered = events
            .iter()
            .find(|e| e.kind == EventKind::RetryRecovered)
            .unwrap();
        assert_eq!(recovered.failures, Some(1));
    }

    #[tokio::test]
    async fn test_exhausted_flag_reported_once_and_retries_continue() {
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::new(vec![offline(); 4]);
        let cfg = Config {
            max_retry_duration: Duration::from_secs(3600),
            ..Config::default()
        };
        let mut coord = coordinator(cfg, clock.clone(), fetch, &capture);
        let mut rx = coord.subscribe();

        coord.run_cycle().await;
        clock.advance(Duration::from_secs(2 * 3600));
        let report = coord.run_cycle().await;
        assert_eq!(report.phase, RetryPhase::Failed);
        assert_eq!(report.delay, 10 * MINUTE);
        let report = coord.run_cycle().await;
        assert_eq!(report.phase, RetryPhase::Failed);

        let exhausted = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| e.kind == EventKind::RetryExhausted)
            .count();
        assert_eq!(exhausted, 1);
        assert!(coord.status().retry.phase == RetryPhase::Failed);
    }

    #[tokio::test]
    async fn test_status_reports_next_fetch_at() {
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::new(Vec::new());
        let mut coord = coordinator(Config::default(), clock, fetch, &capture);

        assert_eq!(coord.status().next_fetch_at, None);
        coord.run_cycle().await;
        let status = coord.status();
        assert_eq!(status.cycles, 1);
        assert_eq!(status.next_fetch_at, Some(at(9, 5)));
    }

    #[tokio::test]
    async fn test_failure_writes_report_with_last_forecast() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::new(vec![Ok(forecast()), offline()]);
        let cfg = Config {
            diagnostics_dir: Some(tmp.path().to_path_buf()),
            ..Config::default()
        };
        let mut coord = coordinator(cfg, clock, fetch, &capture);
        let mut rx = coord.subscribe();

        coord.run_cycle().await;
        assert_eq!(coord.last_forecast().map(<[DailySummary]>::len), Some(1));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);

        coord.run_cycle().await;
        let status = coord.status();
        assert_eq!(status.retry.consecutive_failures, 1);
        assert_eq!(status.last_forecast.as_ref().map(Vec::len), Some(1));

        let path = tmp.path().join("error_20240601T090000_2.json");
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report["cycle"], 2);
        assert_eq!(report["error"], "transport error: offline");
        assert_eq!(report["retry_phase"], "phase1");
        assert_eq!(report["attempt_count"], 1);
        assert_eq!(report["last_forecast"][0]["date"], "2024-06-01");

        let written = std::iter::from_fn(|| rx.try_recv().ok())
            .find(|e| e.kind == EventKind::DiagnosticsWritten)
            .unwrap();
        assert_eq!(written.cycle, Some(2));
        assert_eq!(written.reason.as_deref(), Some(path.display().to_string().as_str()));
    }

    #[tokio::test]
    async fn test_no_report_without_diagnostics_dir() {
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::new(vec![offline()]);
        let mut coord = coordinator(Config::default(), clock, fetch, &capture);
        let mut rx = coord.subscribe();

        coord.run_cycle().await;
        assert!(coord.status().last_forecast.is_none());
        assert!(!std::iter::from_fn(|| rx.try_recv().ok()).any(|e| matches!(
            e.kind,
            EventKind::DiagnosticsWritten | EventKind::DiagnosticsFailed
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_failure() {
        let clock = Arc::new(TokioClock::starting_at(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::slow(Vec::new(), Duration::from_secs(30));
        let mut coord = coordinator(Config::default(), clock, fetch, &capture);

        let report = coord.run_cycle().await;
        assert_eq!(
            report.outcome,
            CycleOutcome::Failed(FetchError::Timeout {
                timeout: Duration::from_secs(15)
            })
        );
        assert_eq!(report.phase, RetryPhase::Phase1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_never_overlaps() {
        let clock = Arc::new(TokioClock::starting_at(at(9, 0)));
        let capture = CaptureRenderer::new();
        // Each fetch takes 2 min and fails; the 1 min backoff from cycle start
        // has always passed by the time the fetch returns.
        let fetch = Scripted::slow(vec![offline(); 8], 2 * MINUTE);
        let cfg = Config {
            fetch_timeout: 5 * MINUTE,
            ..Config::default()
        };
        let coord = coordinator(cfg, clock, fetch.clone(), &capture);
        let mut rx = coord.subscribe();
        let token = CancellationToken::new();

        let handle = tokio::spawn(coord.run(token.clone()));
        time::sleep(7 * MINUTE).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(fetch.max_in_flight.load(Ordering::SeqCst), 1);
        let calls = fetch.calls.load(Ordering::SeqCst);
        assert!((3..=4).contains(&calls), "calls = {calls}");

        let coalesced = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| e.kind == EventKind::CycleCoalesced)
            .count();
        assert!(coalesced >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connectivity_cuts_wait_without_resetting_retry() {
        let clock = Arc::new(TokioClock::starting_at(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::new(vec![offline(); 7]);
        let coord = coordinator(Config::default(), clock, fetch.clone(), &capture);
        let conn = coord.connectivity();
        let mut rx = coord.subscribe();
        let token = CancellationToken::new();

        let handle = tokio::spawn(coord.run(token.clone()));
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 1);

        conn.signal_restored();
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 2);

        token.cancel();
        assert_eq!(handle.await.unwrap(), 2);

        let events: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(events.iter().any(|e| e.kind == EventKind::ConnectivityRestored));
        let last_error = events
            .iter()
            .rev()
            .find(|e| e.kind == EventKind::ErrorRendered)
            .unwrap();
        assert_eq!(last_error.failures, Some(2));
        assert_eq!(
            events.last().map(|e| e.kind),
            Some(EventKind::CoordinatorStopped)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_during_failing_fetch_retries_on_return() {
        let clock = Arc::new(TokioClock::starting_at(at(9, 0)));
        let capture = CaptureRenderer::new();
        // Each fetch hangs for 14s (under the 15s timeout) and then fails.
        let fetch = Scripted::slow(vec![offline(); 4], Duration::from_secs(14));
        let coord = coordinator(Config::default(), clock, fetch.clone(), &capture);
        let conn = coord.connectivity();
        let token = CancellationToken::new();

        let handle = tokio::spawn(coord.run(token.clone()));
        time::sleep(Duration::from_secs(5)).await;
        conn.signal_restored();

        // The first fetch returns at 14s; the retry must not wait out the 1 min backoff.
        time::sleep(Duration::from_secs(15)).await;
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 2);

        token.cancel();
        assert_eq!(handle.await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_during_successful_fetch_is_forgotten() {
        let clock = Arc::new(TokioClock::starting_at(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::slow(Vec::new(), Duration::from_secs(14));
        let coord = coordinator(Config::default(), clock, fetch.clone(), &capture);
        let conn = coord.connectivity();
        let token = CancellationToken::new();

        let handle = tokio::spawn(coord.run(token.clone()));
        time::sleep(Duration::from_secs(5)).await;
        conn.signal_restored();

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 1);

        token.cancel();
        assert_eq!(handle.await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_follows_scheduled_delays() {
        let clock = Arc::new(TokioClock::starting_at(at(9, 0)));
        let capture = CaptureRenderer::new();
        let fetch = Scripted::new(Vec::new());
        let coord = coordinator(Config::default(), clock, fetch.clone(), &capture);
        let token = CancellationToken::new();

        let handle = tokio::spawn(coord.run(token.clone()));
        // Cycles at 0, 5, 10 and 15 minutes.
        time::sleep(16 * MINUTE).await;
        token.cancel();
        assert_eq!(handle.await.unwrap(), 4);
        assert_eq!(capture.frames().len(), 4);
    }
}
