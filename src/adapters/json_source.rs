//! # Forecast source backed by a JSON file.
//!
//! Reads a JSON array of periods on every fetch, so whatever process keeps the
//! file fresh (a cron'd downloader, a test fixture) is picked up without restarts.
//!
//! ```json
//! [
//!   { "timestamp": "2024-06-01T09:00:00+01:00", "category": "Sunny day", "value": 17 },
//!   { "timestamp": "2024-06-01T21:00:00+01:00", "category": "Clear night", "value": 11 }
//! ]
//! ```
//!
//! Unreadable files are transport errors; invalid JSON is a malformed response.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::coordinator::Fetch;
use crate::error::FetchError;
use crate::forecast::Period;

/// Reads periods from a JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Creates a source reading `path` on every fetch.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Fetch for JsonFileSource {
    async fn fetch(&self) -> Result<Vec<Period>, FetchError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FetchError::transport(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&text).map_err(|e| FetchError::malformed(e.to_string()))
    }

    fn name(&self) -> &str {
        "json_file"
    }
}
