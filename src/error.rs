//! Error types used by the forecast update core.
//!
//! This module defines three error enums:
//!
//! - [`FetchError`] a fetch attempt did not produce usable data. Always transient.
//! - [`ObservationError`] one raw period could not become an [`Observation`](crate::Observation).
//! - [`ConfigError`] invalid configuration, fatal at startup.
//!
//! Each provides `as_label` for logs and diagnostics.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by a single fetch attempt.
///
/// None of these halt the update loop: every variant is fed to the
/// [`RetryPolicy`](crate::RetryPolicy) and retried on its ladder.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The fetch collaborator did not answer within the configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// Network or provider failure (connection refused, DNS, 5xx, ...).
    #[error("transport error: {error}")]
    Transport {
        /// The underlying error message.
        error: String,
    },

    /// The provider answered but the payload was unusable.
    #[error("malformed response: {error}")]
    Malformed {
        /// What was wrong with the payload.
        error: String,
    },
}

impl FetchError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use weatherbox::FetchError;
    /// use std::time::Duration;
    ///
    /// let err = FetchError::Timeout { timeout: Duration::from_secs(15) };
    /// assert_eq!(err.as_label(), "fetch_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "fetch_timeout",
            FetchError::Transport { .. } => "fetch_transport",
            FetchError::Malformed { .. } => "fetch_malformed",
        }
    }

    /// Every fetch error is retried; the loop favors availability.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Shorthand for a [`FetchError::Transport`].
    pub fn transport(error: impl Into<String>) -> Self {
        FetchError::Transport {
            error: error.into(),
        }
    }

    /// Shorthand for a [`FetchError::Malformed`].
    pub fn malformed(error: impl Into<String>) -> Self {
        FetchError::Malformed {
            error: error.into(),
        }
    }
}

/// # Why a raw period was dropped before aggregation.
///
/// Fatal to that single period only; aggregation proceeds with the rest.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObservationError {
    /// The period carried no timestamp.
    #[error("missing timestamp")]
    MissingTimestamp,

    /// The timestamp was not a valid RFC 3339 date-time with offset.
    #[error("invalid timestamp {value:?}")]
    InvalidTimestamp {
        /// The raw value as received.
        value: String,
    },

    /// The period carried no category, or a blank one.
    #[error("missing category")]
    MissingCategory,
}

impl ObservationError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ObservationError::MissingTimestamp => "observation_missing_timestamp",
            ObservationError::InvalidTimestamp { .. } => "observation_invalid_timestamp",
            ObservationError::MissingCategory => "observation_missing_category",
        }
    }
}

/// # Configuration errors.
///
/// Raised while loading or validating [`Config`](crate::Config). These are
/// startup errors; the running coordinator never produces them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Day window must start strictly before it ends.
    #[error("day window start {start} must be before end {end}")]
    InvalidDayWindow {
        /// Configured window start (`HH:MM`).
        start: String,
        /// Configured window end (`HH:MM`).
        end: String,
    },

    /// Day bucket must start strictly before the night bucket.
    #[error("day bucket start {day} must be before night bucket start {night}")]
    InvalidBuckets {
        /// Configured day bucket start (`HH:MM`).
        day: String,
        /// Configured night bucket start (`HH:MM`).
        night: String,
    },

    /// A duration that must be positive was zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration {
        /// Name of the offending key.
        field: &'static str,
    },

    /// A backoff phase needs at least one attempt.
    #[error("{field} must allow at least one attempt")]
    ZeroAttempts {
        /// Name of the offending key.
        field: &'static str,
    },

    /// A time-of-day value was not `HH:MM`.
    #[error("{field}: invalid time of day {value:?} (expected HH:MM)")]
    InvalidTime {
        /// Name of the offending key.
        field: &'static str,
        /// The raw value as configured.
        value: String,
    },

    /// Config file could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config file was not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::InvalidDayWindow { .. } => "config_invalid_day_window",
            ConfigError::InvalidBuckets { .. } => "config_invalid_buckets",
            ConfigError::ZeroDuration { .. } => "config_zero_duration",
            ConfigError::ZeroAttempts { .. } => "config_zero_attempts",
            ConfigError::InvalidTime { .. } => "config_invalid_time",
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse(_) => "config_parse",
        }
    }
}
