//! Forecast data and daily aggregation.
//!
//! ## Contents
//! - [`Period`], [`Observation`], [`Category`], [`DailySummary`] data model
//! - [`PeriodAggregator`] raw periods → per-date summaries (day/night buckets)

mod aggregator;
mod model;

pub use aggregator::{Aggregation, BucketBounds, CategoryShare, DroppedPeriod, PeriodAggregator};
pub use model::{Category, DailySummary, Observation, Period};
