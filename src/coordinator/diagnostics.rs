//! # JSON error reports for failed cycles.
//!
//! When a diagnostics directory is configured, every failed cycle leaves one
//! report behind, so a device that went dark can be inspected after the fact:
//! ```text
//! <dir>/error_20240601T090000_3.json
//! {
//!   "timestamp": "2024-06-01T09:00:00+02:00",
//!   "cycle": 3,
//!   "error": "transport error: offline",
//!   "error_kind": "fetch_transport",
//!   "retry_phase": "phase1",
//!   "attempt_count": 3,
//!   "last_forecast": [ ...DailySummary... ]     (null before the first success)
//! }
//! ```

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::error::FetchError;
use crate::forecast::DailySummary;
use crate::policies::{RetryPhase, RetryState};

/// Contents of one error report.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorReport<'a> {
    pub timestamp: DateTime<FixedOffset>,
    pub cycle: u64,
    pub error: String,
    pub error_kind: &'static str,
    pub retry_phase: RetryPhase,
    pub attempt_count: u32,
    pub last_forecast: Option<&'a [DailySummary]>,
}

impl<'a> ErrorReport<'a> {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        cycle: u64,
        err: &FetchError,
        state: &RetryState,
        last_forecast: Option<&'a [DailySummary]>,
    ) -> Self {
        Self {
            timestamp,
            cycle,
            error: err.to_string(),
            error_kind: err.as_label(),
            retry_phase: state.phase,
            attempt_count: state.consecutive_failures,
            last_forecast,
        }
    }

    fn file_name(&self) -> String {
        format!(
            "error_{}_{}.json",
            self.timestamp.format("%Y%m%dT%H%M%S"),
            self.cycle
        )
    }
}

/// Writes [`ErrorReport`]s into a directory, creating it on first use.
#[derive(Clone, Debug)]
pub(crate) struct DiagnosticsWriter {
    dir: PathBuf,
}

impl DiagnosticsWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `report` and returns the path of the new file.
    pub async fn write(&self, report: &ErrorReport<'_>) -> io::Result<PathBuf> {
        let json = serde_json::to_vec_pretty(report).map_err(io::Error::other)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(report.file_name());
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}
