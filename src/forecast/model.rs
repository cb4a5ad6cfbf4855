//! # Forecast data model.
//!
//! - [`Period`] one raw sub-daily record as handed over by the fetch collaborator.
//! - [`Observation`] a validated period: timezone-aware timestamp, category, optional value.
//! - [`Category`] a weather label, or the explicit [`Category::Unknown`] sentinel.
//! - [`DailySummary`] per-date render input produced by the aggregator.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ObservationError;

/// Raw provider record, before validation.
///
/// Every field is optional so a single broken record never fails the whole payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// RFC 3339 timestamp with offset, e.g. `2024-01-15T09:00:00+00:00`.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Provider weather label, e.g. `"Light rain"`.
    #[serde(default)]
    pub category: Option<String>,
    /// Temperature in provider units.
    #[serde(default)]
    pub value: Option<i32>,
}

impl Period {
    /// Convenience constructor for fully populated periods.
    pub fn new(timestamp: impl Into<String>, category: impl Into<String>, value: i32) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            category: Some(category.into()),
            value: Some(value),
        }
    }
}

/// One validated, immutable weather reading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    timestamp: DateTime<FixedOffset>,
    category: String,
    value: Option<i32>,
}

impl Observation {
    /// Builds an observation from already-typed parts.
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        category: impl Into<String>,
        value: Option<i32>,
    ) -> Self {
        Self {
            timestamp,
            category: category.into(),
            value,
        }
    }

    /// Reading time in the provider's local offset.
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Weather label.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Temperature, if the provider sent one.
    pub fn value(&self) -> Option<i32> {
        self.value
    }
}

impl TryFrom<&Period> for Observation {
    type Error = ObservationError;

    fn try_from(period: &Period) -> Result<Self, Self::Error> {
        let raw = period
            .timestamp
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ObservationError::MissingTimestamp)?;
        let timestamp = DateTime::parse_from_rfc3339(raw).map_err(|_| {
            ObservationError::InvalidTimestamp {
                value: raw.to_string(),
            }
        })?;

        let category = period
            .category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ObservationError::MissingCategory)?;

        Ok(Observation::new(timestamp, category, period.value))
    }
}

/// Dominant weather label of a bucket.
///
/// A bucket without observations yields [`Category::Unknown`]; there is no null.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// A provider label.
    Known(String),
    /// No observation fell into the bucket.
    Unknown,
}

impl Category {
    /// Display text of the sentinel.
    pub const UNKNOWN_LABEL: &'static str = "Unknown";

    /// Label text; [`Category::UNKNOWN_LABEL`] for the sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Known(label) => label,
            Category::Unknown => Self::UNKNOWN_LABEL,
        }
    }

    /// True for [`Category::Known`].
    pub fn is_known(&self) -> bool {
        matches!(self, Category::Known(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Aggregated render input for one calendar date.
///
/// Replaced wholesale on every successful fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    /// Calendar date the summary belongs to.
    pub date: NaiveDate,
    /// Highest value over the day and night buckets (`None` if no values).
    pub max_value: Option<i32>,
    /// Lowest value over the day and night buckets (`None` if no values).
    pub min_value: Option<i32>,
    /// Most frequent category in the day bucket.
    pub day_category: Category,
    /// Most frequent category in the night bucket.
    pub night_category: Category,
    /// How many observations were credited to this date.
    pub observation_count: usize,
}

impl DailySummary {
    /// The label to show for the date as a whole: day if known, otherwise night.
    pub fn headline_category(&self) -> &Category {
        if self.day_category.is_known() {
            &self.day_category
        } else {
            &self.night_category
        }
    }
}
