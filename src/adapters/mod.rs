//! Concrete collaborators.
//!
//! - [`JsonFileSource`] fetch collaborator reading a JSON file
//! - [`Renderer`] render capability set, one named variant per output:
//!   - [`Renderer::Log`] writes the forecast through `tracing`
//!   - [`Renderer::Capture`] records [`Frame`]s in memory for tests and diagnostics

mod capture;
mod json_source;
mod log_renderer;

pub use capture::{CaptureRenderer, Frame};
pub use json_source::JsonFileSource;
pub use log_renderer::LogRenderer;

use crate::coordinator::Render;
use crate::forecast::DailySummary;
use crate::policies::RetryState;

/// Render output selected at construction.
#[derive(Clone, Debug)]
pub enum Renderer {
    /// Forecast lines in the log.
    Log(LogRenderer),
    /// In-memory frame recorder.
    Capture(CaptureRenderer),
}

impl Renderer {
    /// Short stable name of the variant.
    pub fn as_label(&self) -> &'static str {
        match self {
            Renderer::Log(_) => "log",
            Renderer::Capture(_) => "capture",
        }
    }
}

impl Render for Renderer {
    fn render(&self, summaries: &[DailySummary]) {
        match self {
            Renderer::Log(r) => r.render(summaries),
            Renderer::Capture(r) => r.render(summaries),
        }
    }

    fn render_error(&self, state: &RetryState) {
        match self {
            Renderer::Log(r) => r.render_error(state),
            Renderer::Capture(r) => r.render_error(state),
        }
    }
}

impl From<LogRenderer> for Renderer {
    fn from(r: LogRenderer) -> Self {
        Renderer::Log(r)
    }
}

impl From<CaptureRenderer> for Renderer {
    fn from(r: CaptureRenderer) -> Self {
        Renderer::Capture(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatches_to_variant() {
        let capture = CaptureRenderer::new();
        let renderer = Renderer::from(capture.clone());
        assert_eq!(renderer.as_label(), "capture");

        renderer.render_error(&RetryState::default());
        assert_eq!(capture.frames().len(), 1);

        let log: Renderer = LogRenderer::default().into();
        assert_eq!(log.as_label(), "log");
        log.render(&[]);
    }
}
