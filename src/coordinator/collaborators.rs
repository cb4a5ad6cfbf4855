//! # External collaborators driven by the coordinator.
//!
//! The coordinator is the only caller of these interfaces:
//! - [`Fetch`] retrieves raw forecast periods (may block on I/O, bounded by a timeout).
//! - [`Render`] receives daily summaries or an error signal; fire-and-forget.
//! - [`Connectivity`] lets the network layer cut the current wait short.
//!
//! [`FetchFn`] wraps a closure producing a fresh future per call, handy for wiring
//! a source without a dedicated type.
//!
//! ## Example
//! ```rust
//! use weatherbox::{Fetch, FetchFn, FetchError, Period};
//!
//! let source = FetchFn::arc("static", || async {
//!     Ok::<_, FetchError>(vec![Period::new("2024-06-01T09:00:00+00:00", "Clear", 15)])
//! });
//! assert_eq!(source.name(), "static");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::FetchError;
use crate::forecast::{DailySummary, Period};
use crate::policies::RetryState;

/// Source of raw forecast periods.
///
/// Must be callable repeatedly; every call is an independent attempt.
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    /// Retrieves the current forecast.
    async fn fetch(&self) -> Result<Vec<Period>, FetchError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        "fetch"
    }
}

/// Shared handle to a fetch collaborator.
pub type FetchRef = Arc<dyn Fetch>;

/// Sink for rendered output.
///
/// Both calls are fire-and-forget: nothing is returned to the coordinator.
pub trait Render: Send + Sync + 'static {
    /// Shows fresh daily summaries (never empty).
    fn render(&self, summaries: &[DailySummary]);

    /// Shows the error signal; `state` is the retry state after the failure.
    fn render_error(&self, state: &RetryState);
}

/// Shared handle to a render collaborator.
pub type RenderRef = Arc<dyn Render>;

/// Function-backed fetch collaborator.
#[derive(Debug)]
pub struct FetchFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> FetchFn<F> {
    /// Creates a new function-backed source.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the source and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Fetch for FetchFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Period>, FetchError>> + Send + 'static,
{
    async fn fetch(&self) -> Result<Vec<Period>, FetchError> {
        (self.f)().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Clonable "connectivity restored" signal.
///
/// Raising it while the coordinator waits abandons the remaining delay and
/// starts a cycle right away. It never touches the retry state.
#[derive(Clone, Debug)]
pub struct Connectivity {
    tx: Arc<watch::Sender<u64>>,
}

impl Connectivity {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Signals that the network is back.
    pub fn signal_restored(&self) {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    pub(crate) fn watch(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

/// Completes on the next restore signal; never completes once every handle is gone.
pub(crate) async fn restored(rx: &mut watch::Receiver<u64>) {
    if rx.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}
