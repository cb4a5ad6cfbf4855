//! # Runtime configuration.
//!
//! Provides [`Config`], the read-only settings of the update core. It is built once
//! at startup (from defaults or a TOML file) and never reloaded mid-run.
//!
//! ## File format
//! Every key is optional; missing keys fall back to the defaults shown.
//! ```toml
//! [cadence]
//! day_start = "06:00"
//! day_end = "23:00"
//! day_interval_secs = 300
//! night_interval_secs = 3600
//!
//! [backoff]
//! phase1_interval_secs = 60
//! phase1_attempts = 5
//! phase2_interval_secs = 300
//! phase2_attempts = 12
//! phase3_interval_secs = 600
//! max_retry_secs = 86400
//!
//! [fetch]
//! timeout_secs = 15
//!
//! [aggregation]
//! day_starts = "06:00"
//! night_starts = "18:00"
//!
//! [events]
//! bus_capacity = 1024
//!
//! [diagnostics]
//! dir = "/var/lib/weatherbox/diagnostics"   # unset: no error reports
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::forecast::BucketBounds;
use crate::policies::{BackoffLadder, BackoffStep, CadenceWindow};

/// Validated configuration for the update coordinator.
///
/// ## Field semantics
/// - `cadence`: day window and base intervals (used while retry is idle)
/// - `backoff`: three-phase retry ladder
/// - `max_retry_duration`: streak length after which the `FAILED` flag is raised
/// - `fetch_timeout`: upper bound of one fetch attempt
/// - `buckets`: day/night bucket boundaries of the aggregator
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `diagnostics_dir`: where error reports are written (`None` disables them)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Day/night cadence window.
    pub cadence: CadenceWindow,
    /// Retry ladder.
    pub backoff: BackoffLadder,
    /// Failure streak length before the `FAILED` flag is raised.
    pub max_retry_duration: Duration,
    /// Upper bound of one fetch attempt; a timeout counts as a failure.
    pub fetch_timeout: Duration,
    /// Aggregation buckets.
    pub buckets: BucketBounds,
    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
    /// Directory for JSON error reports.
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - day 06:00–23:00, 5min by day, 60min by night
    /// - backoff 1min × 5, 5min × 12, then 10min
    /// - `max_retry_duration = 24h`
    /// - `fetch_timeout = 15s`
    /// - buckets at 06:00 / 18:00
    /// - `bus_capacity = 1024`
    /// - no error reports
    fn default() -> Self {
        Self {
            cadence: CadenceWindow::default(),
            backoff: BackoffLadder::default(),
            max_retry_duration: Duration::from_secs(24 * 3600),
            fetch_timeout: Duration::from_secs(15),
            buckets: BucketBounds::default(),
            bus_capacity: 1024,
            diagnostics_dir: None,
        }
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text)?;
        let cfg = Config::try_from(file)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cadence.day_start >= self.cadence.day_end {
            return Err(ConfigError::InvalidDayWindow {
                start: fmt_hm(self.cadence.day_start),
                end: fmt_hm(self.cadence.day_end),
            });
        }
        if self.buckets.day_starts >= self.buckets.night_starts {
            return Err(ConfigError::InvalidBuckets {
                day: fmt_hm(self.buckets.day_starts),
                night: fmt_hm(self.buckets.night_starts),
            });
        }

        let durations = [
            ("cadence.day_interval_secs", self.cadence.day_interval),
            ("cadence.night_interval_secs", self.cadence.night_interval),
            ("backoff.phase1_interval_secs", self.backoff.first.interval),
            ("backoff.phase2_interval_secs", self.backoff.second.interval),
            ("backoff.phase3_interval_secs", self.backoff.last),
            ("backoff.max_retry_secs", self.max_retry_duration),
            ("fetch.timeout_secs", self.fetch_timeout),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { field });
            }
        }

        if self.backoff.first.attempts == 0 {
            return Err(ConfigError::ZeroAttempts {
                field: "backoff.phase1_attempts",
            });
        }
        if self.backoff.second.attempts == 0 {
            return Err(ConfigError::ZeroAttempts {
                field: "backoff.phase2_attempts",
            });
        }
        Ok(())
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

/// On-disk shape of the configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    cadence: CadenceSection,
    backoff: BackoffSection,
    fetch: FetchSection,
    aggregation: AggregationSection,
    events: EventsSection,
    diagnostics: DiagnosticsSection,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CadenceSection {
    day_start: String,
    day_end: String,
    day_interval_secs: u64,
    night_interval_secs: u64,
}

impl Default for CadenceSection {
    fn default() -> Self {
        Self {
            day_start: "06:00".into(),
            day_end: "23:00".into(),
            day_interval_secs: 5 * 60,
            night_interval_secs: 60 * 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BackoffSection {
    phase1_interval_secs: u64,
    phase1_attempts: u32,
    phase2_interval_secs: u64,
    phase2_attempts: u32,
    phase3_interval_secs: u64,
    max_retry_secs: u64,
}

impl Default for BackoffSection {
    fn default() -> Self {
        Self {
            phase1_interval_secs: 60,
            phase1_attempts: 5,
            phase2_interval_secs: 5 * 60,
            phase2_attempts: 12,
            phase3_interval_secs: 10 * 60,
            max_retry_secs: 24 * 3600,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FetchSection {
    timeout_secs: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AggregationSection {
    day_starts: String,
    night_starts: String,
}

impl Default for AggregationSection {
    fn default() -> Self {
        Self {
            day_starts: "06:00".into(),
            night_starts: "18:00".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EventsSection {
    bus_capacity: usize,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self { bus_capacity: 1024 }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DiagnosticsSection {
    dir: Option<PathBuf>,
}

impl TryFrom<FileConfig> for Config {
    type Error = ConfigError;

    fn try_from(file: FileConfig) -> Result<Self, Self::Error> {
        let FileConfig {
            cadence,
            backoff,
            fetch,
            aggregation,
            events,
            diagnostics,
        } = file;

        Ok(Config {
            cadence: CadenceWindow {
                day_start: parse_hm("cadence.day_start", &cadence.day_start)?,
                day_end: parse_hm("cadence.day_end", &cadence.day_end)?,
                day_interval: Duration::from_secs(cadence.day_interval_secs),
                night_interval: Duration::from_secs(cadence.night_interval_secs),
            },
            backoff: BackoffLadder {
                first: BackoffStep {
                    interval: Duration::from_secs(backoff.phase1_interval_secs),
                    attempts: backoff.phase1_attempts,
                },
                second: BackoffStep {
                    interval: Duration::from_secs(backoff.phase2_interval_secs),
                    attempts: backoff.phase2_attempts,
                },
                last: Duration::from_secs(backoff.phase3_interval_secs),
            },
            max_retry_duration: Duration::from_secs(backoff.max_retry_secs),
            fetch_timeout: Duration::from_secs(fetch.timeout_secs),
            buckets: BucketBounds {
                day_starts: parse_hm("aggregation.day_starts", &aggregation.day_starts)?,
                night_starts: parse_hm("aggregation.night_starts", &aggregation.night_starts)?,
            },
            bus_capacity: events.bus_capacity,
            diagnostics_dir: diagnostics.dir,
        })
    }
}

fn parse_hm(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::InvalidTime {
        field,
        value: value.to_string(),
    })
}

fn fmt_hm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(15));
        assert_eq!(cfg.max_retry_duration, Duration::from_secs(86_400));
    }

    #[test]
    fn test_empty_document_equals_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_override() {
        let cfg = Config::from_toml_str(
            r#"
            [cadence]
            day_start = "07:30"
            night_interval_secs = 1800

            [backoff]
            phase2_attempts = 3

            [fetch]
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(cfg.cadence.day_start, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(cfg.cadence.day_end, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
        assert_eq!(cfg.cadence.night_interval, Duration::from_secs(1800));
        assert_eq!(cfg.backoff.second.attempts, 3);
        assert_eq!(cfg.backoff.first, BackoffLadder::default().first);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_inverted_day_window_is_fatal() {
        let err = Config::from_toml_str(
            r#"
            [cadence]
            day_start = "23:00"
            day_end = "06:00"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.as_label(), "config_invalid_day_window");

        let mut cfg = Config::default();
        cfg.cadence.day_end = cfg.cadence.day_start;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidDayWindow { .. })
        ));
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let err = Config::from_toml_str("[fetch]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ZeroDuration {
                field: "fetch.timeout_secs"
            }
        ));

        let err = Config::from_toml_str("[backoff]\nphase1_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroAttempts { .. }));
    }

    #[test]
    fn test_bad_time_and_unknown_keys() {
        let err = Config::from_toml_str("[aggregation]\nday_starts = \"6am\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidTime {
                field: "aggregation.day_starts",
                ..
            }
        ));

        let err = Config::from_toml_str("[fetch]\nretries = 3\n").unwrap_err();
        assert_eq!(err.as_label(), "config_parse");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[events]\nbus_capacity = 0").unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.bus_capacity, 0);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_diagnostics_dir() {
        assert_eq!(Config::default().diagnostics_dir, None);
        let cfg = Config::from_toml_str("[diagnostics]\ndir = \"/tmp/wb\"\n").unwrap();
        assert_eq!(cfg.diagnostics_dir, Some(PathBuf::from("/tmp/wb")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/weatherbox.toml").unwrap_err();
        assert_eq!(err.as_label(), "config_read");
    }
}
