//! # Structured logging subscriber.
//!
//! [`LogWriter`] turns coordinator events into `tracing` records so that the
//! update loop can be followed from any configured `tracing` sink.
//!
//! ## Output format (default fmt layer)
//! ```text
//! INFO  cycle starting cycle=1 phase=idle
//! WARN  fetch failed cycle=1 reason="connection refused"
//! INFO  retry phase changed from=idle to=phase_1 failures=1
//! INFO  next fetch scheduled cycle=1 delay_ms=60000 source=backoff
//! ERROR retry exhausted failures=145 reason="connection refused"
//! ```
//!
//! Level mapping: routine cycle progress is `debug`/`info`, failures are `warn`,
//! the `FAILED` flag and subscriber panics are `error`.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{DelaySource, Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards events to `tracing`.
pub struct LogWriter;

fn phase_label(ev: &Event) -> &'static str {
    ev.phase.map(|p| p.as_label()).unwrap_or("-")
}

fn source_label(ev: &Event) -> &'static str {
    match ev.delay_source {
        Some(DelaySource::Cadence) => "cadence",
        Some(DelaySource::Backoff) => "backoff",
        None => "-",
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::CycleStarting => {
                debug!(cycle = ?e.cycle, phase = phase_label(e), "cycle starting");
            }
            EventKind::FetchSucceeded => {
                debug!(cycle = ?e.cycle, periods = ?e.count, "fetch succeeded");
            }
            EventKind::FetchFailed => {
                warn!(cycle = ?e.cycle, reason, "fetch failed");
            }
            EventKind::TimeoutHit => {
                warn!(cycle = ?e.cycle, timeout_ms = ?e.timeout_ms, "fetch timed out");
            }
            EventKind::ObservationDropped => {
                debug!(cycle = ?e.cycle, index = ?e.count, reason, "observation dropped");
            }
            EventKind::SummariesRendered => {
                info!(cycle = ?e.cycle, days = ?e.count, "summaries rendered");
            }
            EventKind::ErrorRendered => {
                info!(cycle = ?e.cycle, phase = phase_label(e), "error rendered");
            }
            EventKind::DiagnosticsWritten => {
                debug!(cycle = ?e.cycle, path = reason, "error report written");
            }
            EventKind::DiagnosticsFailed => {
                warn!(cycle = ?e.cycle, reason, "error report not written");
            }
            EventKind::PhaseChanged => {
                info!(
                    from = e.previous_phase.map(|p| p.as_label()).unwrap_or("-"),
                    to = phase_label(e),
                    failures = ?e.failures,
                    "retry phase changed"
                );
            }
            EventKind::RetryExhausted => {
                error!(failures = ?e.failures, reason, "retry exhausted");
            }
            EventKind::RetryRecovered => {
                info!(failures = ?e.failures, "recovered after failures");
            }
            EventKind::NextFetchScheduled => {
                info!(
                    cycle = ?e.cycle,
                    delay_ms = ?e.delay_ms,
                    source = source_label(e),
                    "next fetch scheduled"
                );
            }
            EventKind::CycleCoalesced => {
                warn!(cycle = ?e.cycle, late_ms = ?e.delay_ms, "cycle overran its delay");
            }
            EventKind::ConnectivityRestored => {
                info!("connectivity restored, fetching early");
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested");
            }
            EventKind::CoordinatorStopped => {
                info!(cycles = ?e.cycle, "coordinator stopped");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = ?e.source, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = ?e.source, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
