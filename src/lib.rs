//! # weatherbox
//!
//! **Weatherbox** decides, deterministically and testably, **when** to fetch a
//! multi-day weather forecast and **what** to render from it.
//!
//! The network client and the display are external collaborators plugged in
//! through the [`Fetch`] and [`Render`] traits. The crate owns the scheduling and
//! aggregation core: a failure-aware retry state machine, a day/night cadence
//! policy, and an aggregator turning sub-daily periods into daily summaries.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Clock ──► now ─────────┬────────────────────┬───────────────────┐
//!                          ▼                    ▼                   ▼
//!                  ┌───────────────┐    ┌──────────────┐    ┌───────────────────┐
//!                  │ CadencePolicy │    │ RetryPolicy  │    │ UpdateCoordinator │
//!                  │ (day / night) │    │ (IDLE→P1→P2  │    │  - one cycle at   │
//!                  └───────┬───────┘    │  →P3, FAILED)│    │    a time         │
//!                          │ base       └──────┬───────┘    │  - next delay     │
//!                          └────────────────►  │ backoff ◄──┤  - connectivity   │
//!                                              └──────────► │    wake-up        │
//!                                                           └──┬──────────┬─────┘
//!                                          Fetch::fetch() ◄────┘          │
//!                                               │ Vec<Period>             │
//!                                               ▼                         │
//!                                     ┌──────────────────┐                │
//!                                     │ PeriodAggregator │─► DailySummary ┴─► Render
//!                                     └──────────────────┘
//!
//!  UpdateCoordinator / fetch runner ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                        ┌─────────┼─────────┐
//!                                                                        ▼         ▼         ▼
//!                                                                    LogWriter HealthTracker ...
//! ```
//!
//! ### Cycle
//! ```text
//! run(token) loop {
//!   ├─► base = CadencePolicy::interval_for(now)
//!   ├─► publish CycleStarting{ cycle, phase }
//!   ├─► fetch_once(timeout)
//!   │       ├─ Ok(periods) ─► aggregate ─► ObservationDropped per bad period
//!   │       │                    ├─ summaries ─► record_success ─► render()       ─► delay = base
//!   │       │                    └─ none      ─► failure (malformed)
//!   │       └─ Err ──────────────────────────► record_failure ─► render_error() ─► delay = backoff
//!   ├─► publish NextFetchScheduled{ delay, source }
//!   └─► wait until cycle start + delay, or connectivity restored, or cancelled
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                            |
//! |-------------------|----------------------------------------------------------|-----------------------------------------------|
//! | **Coordination**  | Sequential fetch loop, scheduling, connectivity wake-up. | [`UpdateCoordinator`], [`Connectivity`]       |
//! | **Policies**      | Backoff ladder with `FAILED` flag, day/night cadence.    | [`RetryPolicy`], [`CadencePolicy`]            |
//! | **Aggregation**   | Sub-daily periods to per-day summaries.                  | [`PeriodAggregator`], [`DailySummary`]        |
//! | **Collaborators** | Pluggable data source and output.                        | [`Fetch`], [`Render`], [`Renderer`]           |
//! | **Events**        | Diagnostics bus and subscribers.                         | [`Event`], [`Subscribe`], [`HealthTracker`]   |
//! | **Time**          | Injectable clocks for production and tests.              | [`Clock`], [`SystemClock`], [`TokioClock`]    |
//! | **Configuration** | Typed, validated, TOML-backed settings.                  | [`Config`]                                    |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use weatherbox::{CaptureRenderer, Config, FetchError, FetchFn, Period, UpdateCoordinator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = FetchFn::arc("fixture", || async {
//!         Ok::<_, FetchError>(vec![
//!             Period::new("2024-06-01T09:00:00+00:00", "Clear", 15),
//!             Period::new("2024-06-01T21:00:00+00:00", "Rainy", 9),
//!         ])
//!     });
//!     let capture = CaptureRenderer::new();
//!
//!     let mut coordinator = UpdateCoordinator::builder(Config::default())
//!         .build(source, Arc::new(capture.clone()))?;
//!
//!     let report = coordinator.run_cycle().await;
//!     assert!(report.outcome.is_success());
//!     assert_eq!(capture.frames().len(), 1);
//!     Ok(())
//! }
//! ```
mod adapters;
mod clock;
mod config;
mod coordinator;
mod error;
mod events;
mod forecast;
mod policies;
mod shutdown;
mod subscribers;

pub mod logging;

// ---- Public re-exports ----

pub use adapters::{CaptureRenderer, Frame, JsonFileSource, LogRenderer, Renderer};
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::Config;
pub use coordinator::{
    Connectivity, CoordinatorBuilder, CoordinatorStatus, CycleOutcome, CycleReport, Fetch,
    FetchFn, FetchRef, Render, RenderRef, UpdateCoordinator,
};
pub use error::{ConfigError, FetchError, ObservationError};
pub use events::{Bus, DelaySource, Event, EventKind};
pub use forecast::{
    Aggregation, BucketBounds, Category, CategoryShare, DailySummary, DroppedPeriod, Observation,
    Period, PeriodAggregator,
};
pub use policies::{
    BackoffLadder, BackoffStep, CadencePolicy, CadenceWindow, RetryPhase, RetryPolicy, RetryState,
};
pub use shutdown::wait_for_shutdown_signal;
pub use subscribers::{HealthSnapshot, HealthTracker, LogWriter, Subscribe, SubscriberSet};
