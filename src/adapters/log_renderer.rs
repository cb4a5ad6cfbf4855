//! # Renderer that writes the forecast to the log.
//!
//! Stand-in for a physical display: one `tracing` record per shown day, using
//! the same headline choice a display would (day label, else night label).
//!
//! Days are shown in the order the aggregator produced them. Readings before the
//! day bucket opens are credited to the previous date's night, so a forecast whose
//! first period is pre-dawn starts with a night-only summary for the day before.
//! That summary takes the first slot; its headline is the night label.

use tracing::{info, warn};

use crate::coordinator::Render;
use crate::forecast::DailySummary;
use crate::policies::RetryState;

/// Logs summaries at `info` and the error signal at `warn`.
#[derive(Clone, Copy, Debug)]
pub struct LogRenderer {
    days: usize,
}

impl LogRenderer {
    /// Number of days a four-panel display shows.
    pub const DEFAULT_DAYS: usize = 4;

    /// Shows at most `days` summaries per render (minimum 1).
    pub fn new(days: usize) -> Self {
        Self { days: days.max(1) }
    }

    /// How many days are shown per render.
    pub fn days(&self) -> usize {
        self.days
    }

    /// The leading summaries a render call shows, in the order given.
    pub fn shown<'a>(&self, summaries: &'a [DailySummary]) -> &'a [DailySummary] {
        &summaries[..summaries.len().min(self.days)]
    }
}

impl Default for LogRenderer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DAYS)
    }
}

fn fmt_value(v: Option<i32>) -> String {
    v.map_or_else(|| "--".to_string(), |v| v.to_string())
}

impl Render for LogRenderer {
    fn render(&self, summaries: &[DailySummary]) {
        for day in self.shown(summaries) {
            info!(
                date = %day.date,
                headline = %day.headline_category(),
                day = %day.day_category,
                night = %day.night_category,
                max = %fmt_value(day.max_value),
                min = %fmt_value(day.min_value),
                "forecast"
            );
        }
    }

    fn render_error(&self, state: &RetryState) {
        warn!(
            phase = state.phase.as_label(),
            failures = state.consecutive_failures,
            "forecast unavailable"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{Category, Period, PeriodAggregator};

    #[test]
    fn test_days_clamped() {
        assert_eq!(LogRenderer::new(0).days(), 1);
        assert_eq!(LogRenderer::default().days(), 4);
    }

    #[test]
    fn test_pre_dawn_start_shows_previous_night_first() {
        let agg = PeriodAggregator::default().aggregate(&[
            Period::new("2024-01-15T03:00:00+00:00", "Fog", 1),
            Period::new("2024-01-15T09:00:00+00:00", "Sunny", 8),
            Period::new("2024-01-16T09:00:00+00:00", "Rain", 6),
        ]);
        let shown = LogRenderer::new(2).shown(&agg.summaries);

        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].date.to_string(), "2024-01-14");
        assert_eq!(shown[0].day_category, Category::Unknown);
        assert_eq!(shown[0].headline_category(), &Category::Known("Fog".into()));
        assert_eq!(shown[1].date.to_string(), "2024-01-15");
    }

    #[test]
    fn test_missing_value_placeholder() {
        assert_eq!(fmt_value(None), "--");
        assert_eq!(fmt_value(Some(-3)), "-3");
    }
}
