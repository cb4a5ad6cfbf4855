//! Scheduling policies.
//!
//! This module groups the knobs that decide **how long** to wait before the next
//! fetch attempt.
//!
//! ## Contents
//! - [`CadencePolicy`] base interval by time of day (day / night window)
//! - [`RetryPolicy`]   failure streak state machine over a [`BackoffLadder`]
//!
//! ## Quick wiring
//! ```text
//! UpdateCoordinator
//!      ├─► cadence.interval_for(now)       while retry is Idle
//!      └─► retry.record_failure(now)       overrides cadence during backoff
//!          retry.record_success(now)       back to Idle, cadence resumes
//! ```
//!
//! ## Defaults
//! - `CadenceWindow::default()` → day 06:00–23:00, 5min by day, 60min by night.
//! - `BackoffLadder::default()` → 1min × 5, 5min × 12, then 10min.

mod cadence;
mod retry;

pub use cadence::{CadencePolicy, CadenceWindow};
pub use retry::{BackoffLadder, BackoffStep, RetryPhase, RetryPolicy, RetryState};
