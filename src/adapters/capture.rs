//! # Renderer that records frames in memory.
//!
//! Test-capture variant of the display: every render call becomes a [`Frame`]
//! that tests and diagnostics can inspect afterwards. Clones share the same
//! frame list.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::coordinator::Render;
use crate::forecast::DailySummary;
use crate::policies::{RetryPhase, RetryState};

/// One recorded render call.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    /// `render` was called.
    Summaries {
        /// The summaries handed over.
        days: Vec<DailySummary>,
    },
    /// `render_error` was called.
    Error {
        /// Retry phase at the time of the call.
        phase: RetryPhase,
        /// Consecutive failures at the time of the call.
        consecutive_failures: u32,
    },
}

/// Records every render call.
#[derive(Clone, Debug, Default)]
pub struct CaptureRenderer {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl CaptureRenderer {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Frame>> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of every frame recorded so far, oldest first.
    pub fn frames(&self) -> Vec<Frame> {
        self.lock().clone()
    }

    /// Most recent frame.
    pub fn last(&self) -> Option<Frame> {
        self.lock().last().cloned()
    }

    /// Forgets all recorded frames.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Recorded frames as pretty JSON, for diagnostics dumps.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.lock())
    }
}

impl Render for CaptureRenderer {
    fn render(&self, summaries: &[DailySummary]) {
        self.lock().push(Frame::Summaries {
            days: summaries.to_vec(),
        });
    }

    fn render_error(&self, state: &RetryState) {
        self.lock().push(Frame::Error {
            phase: state.phase,
            consecutive_failures: state.consecutive_failures,
        });
    }
}
