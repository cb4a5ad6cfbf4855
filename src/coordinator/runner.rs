//! # Run a single fetch attempt.
//!
//! Executes one [`Fetch`] call bounded by the configured timeout and publishes its
//! outcome to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success:
//!   fetch() → Ok(periods) → publish FetchSucceeded
//!
//! Failure:
//!   fetch() → Err(Transport/Malformed) → publish FetchFailed
//!
//! Timeout:
//!   timeout exceeded → drop the fetch future → publish TimeoutHit
//!                                           → return Timeout error
//!                                           → publish FetchFailed (timeout)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `FetchSucceeded` or `FetchFailed`
//! - `TimeoutHit` is published **in addition to** `FetchFailed` on timeout
//! - The timeout is always non-zero (`Config::validate` rejects zero)
//! - These events describe the transfer only. The coordinator may still reject a
//!   `FetchSucceeded` payload with no usable periods and publish its own `FetchFailed`
//!   for the same cycle

use std::time::Duration;

use tokio::time;

use crate::coordinator::Fetch;
use crate::error::FetchError;
use crate::events::{Bus, Event, EventKind};
use crate::forecast::Period;

/// Executes a single fetch attempt for `cycle`, publishing outcome events to `bus`.
pub(crate) async fn fetch_once<F: Fetch + ?Sized>(
    fetcher: &F,
    timeout: Duration,
    cycle: u64,
    bus: &Bus,
) -> Result<Vec<Period>, FetchError> {
    let res = match time::timeout(timeout, fetcher.fetch()).await {
        Ok(r) => r,
        Err(_elapsed) => {
            publish_timeout(bus, cycle, timeout);
            Err(FetchError::Timeout { timeout })
        }
    };

    match &res {
        Ok(periods) => publish_succeeded(bus, cycle, periods.len()),
        Err(e) => publish_failed(bus, cycle, e),
    }
    res
}

fn publish_succeeded(bus: &Bus, cycle: u64, count: usize) {
    bus.publish(
        Event::new(EventKind::FetchSucceeded)
            .with_cycle(cycle)
            .with_count(count),
    );
}

pub(crate) fn publish_failed(bus: &Bus, cycle: u64, err: &FetchError) {
    bus.publish(
        Event::new(EventKind::FetchFailed)
            .with_cycle(cycle)
            .with_reason(err.to_string()),
    );
}

fn publish_timeout(bus: &Bus, cycle: u64, timeout: Duration) {
    bus.publish(
        Event::new(EventKind::TimeoutHit)
            .with_cycle(cycle)
            .with_timeout(timeout),
    );
}
