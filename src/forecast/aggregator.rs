//! # Period aggregation.
//!
//! [`PeriodAggregator`] turns ordered sub-daily periods into one [`DailySummary`]
//! per calendar date.
//!
//! ## Buckets
//! ```text
//!          date D                                  date D+1
//! 00:00 ─── 06:00 ───────────── 18:00 ─────────── 00:00 ─── 06:00 ───
//!  (D-1 night) │      D day       │           D night           │ D+1 day
//! ```
//! - Day bucket: local time in `[06:00, 18:00)`.
//! - Night bucket: `[18:00, 06:00)` across midnight; pre-dawn readings are credited
//!   to the previous date's night.
//! - A reading exactly at a boundary belongs to the bucket that starts there.
//!
//! ## Rules
//! - `max_value` / `min_value` span **all** observations credited to the date.
//! - Bucket category is the most frequent label; ties go to the label seen first
//!   (chronologically) in that bucket.
//! - Empty bucket → [`Category::Unknown`].
//! - Periods with a missing/invalid timestamp or category are dropped and reported
//!   in [`Aggregation::dropped`]; the rest still aggregate.
//! - Dates with no usable observation produce no summary.
//! - Pure: the same input always yields the same output.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::error::ObservationError;
use crate::forecast::model::{Category, DailySummary, Observation, Period};

/// Bucket boundaries, in local time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketBounds {
    /// Start of the day bucket (inclusive); also the end of the night bucket.
    pub day_starts: NaiveTime,
    /// Start of the night bucket (inclusive); also the end of the day bucket.
    pub night_starts: NaiveTime,
}

impl Default for BucketBounds {
    /// Returns `day_starts = 06:00`, `night_starts = 18:00`.
    fn default() -> Self {
        Self {
            day_starts: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
            night_starts: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// A period that could not be used, with its position in the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedPeriod {
    /// Index in the input slice.
    pub index: usize,
    /// Why it was dropped.
    pub error: ObservationError,
}

/// Output of [`PeriodAggregator::aggregate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// One summary per date, ascending.
    pub summaries: Vec<DailySummary>,
    /// Periods dropped during validation.
    pub dropped: Vec<DroppedPeriod>,
}

/// Share of one category in a set of observations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryShare {
    /// Weather label.
    pub category: String,
    /// Occurrences.
    pub count: usize,
    /// Percentage of the total, rounded to one decimal.
    pub percent: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bucket {
    Day,
    Night,
}

#[derive(Default)]
struct DateBuckets<'a> {
    day: Vec<&'a Observation>,
    night: Vec<&'a Observation>,
}

/// Aggregates periods into daily summaries.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeriodAggregator {
    bounds: BucketBounds,
}

impl PeriodAggregator {
    /// Creates an aggregator with the given (validated) bucket bounds.
    pub fn new(bounds: BucketBounds) -> Self {
        Self { bounds }
    }

    /// Validates `periods` and aggregates the usable ones.
    pub fn aggregate(&self, periods: &[Period]) -> Aggregation {
        let mut observations = Vec::with_capacity(periods.len());
        let mut dropped = Vec::new();

        for (index, period) in periods.iter().enumerate() {
            match Observation::try_from(period) {
                Ok(obs) => observations.push(obs),
                Err(error) => dropped.push(DroppedPeriod { index, error }),
            }
        }

        Aggregation {
            summaries: self.summarize(&observations),
            dropped,
        }
    }

    /// Aggregates already validated observations.
    pub fn summarize(&self, observations: &[Observation]) -> Vec<DailySummary> {
        let mut ordered: Vec<&Observation> = observations.iter().collect();
        // Stable: equal instants keep their input order.
        ordered.sort_by_key(|obs| obs.timestamp());

        let mut dates: BTreeMap<NaiveDate, DateBuckets<'_>> = BTreeMap::new();
        for obs in ordered {
            let Some((date, bucket)) = self.attribute(obs) else {
                continue;
            };
            let entry = dates.entry(date).or_default();
            match bucket {
                Bucket::Day => entry.day.push(obs),
                Bucket::Night => entry.night.push(obs),
            }
        }

        dates
            .into_iter()
            .map(|(date, buckets)| summarize_date(date, &buckets))
            .collect()
    }

    /// Per-category counts and percentages, in first-seen order.
    pub fn distribution(&self, observations: &[Observation]) -> Vec<CategoryShare> {
        let total = observations.len();
        if total == 0 {
            return Vec::new();
        }
        tally(observations.iter())
            .into_iter()
            .map(|(category, count)| CategoryShare {
                category: category.to_string(),
                count,
                percent: (1000.0 * count as f64 / total as f64).round() / 10.0,
            })
            .collect()
    }

    /// Date and bucket an observation is credited to.
    fn attribute(&self, obs: &Observation) -> Option<(NaiveDate, Bucket)> {
        let local = obs.timestamp();
        let (date, time) = (local.date_naive(), local.time());

        if time < self.bounds.day_starts {
            date.checked_sub_days(Days::new(1))
                .map(|previous| (previous, Bucket::Night))
        } else if time < self.bounds.night_starts {
            Some((date, Bucket::Day))
        } else {
            Some((date, Bucket::Night))
        }
    }
}

fn summarize_date(date: NaiveDate, buckets: &DateBuckets<'_>) -> DailySummary {
    let values = buckets
        .day
        .iter()
        .chain(buckets.night.iter())
        .filter_map(|obs| obs.value());
    let (min_value, max_value) = values.fold((None, None), |(lo, hi), v| {
        (
            Some(lo.map_or(v, |lo: i32| lo.min(v))),
            Some(hi.map_or(v, |hi: i32| hi.max(v))),
        )
    });

    DailySummary {
        date,
        max_value,
        min_value,
        day_category: dominant(&buckets.day),
        night_category: dominant(&buckets.night),
        observation_count: buckets.day.len() + buckets.night.len(),
    }
}

/// Most frequent category; ties resolved by first appearance. `bucket` is chronological.
fn dominant(bucket: &[&Observation]) -> Category {
    let mut best: Option<(&str, usize)> = None;
    for (category, count) in tally(bucket.iter().copied()) {
        // Strictly greater: an earlier-seen category keeps a tie.
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((category, count));
        }
    }
    best.map_or(Category::Unknown, |(category, _)| {
        Category::Known(category.to_string())
    })
}

/// Counts categories, preserving first-seen order.
fn tally<'a>(observations: impl Iterator<Item = &'a Observation>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for obs in observations {
        match counts.iter_mut().find(|(c, _)| *c == obs.category()) {
            Some((_, n)) => *n += 1,
            None => counts.push((obs.category(), 1)),
        }
    }
    counts
}
