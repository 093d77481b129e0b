use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_DATA_FILE: &str = "network-speed-history.json";
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One persisted measurement. Serialized field names are the on-disk format;
/// existing history files depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedPoint {
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    /// Bytes per second.
    pub download: f64,
    /// Bytes per second.
    pub upload: f64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("history file {path} does not hold a JSON array")]
    Corrupt { path: PathBuf },
    #[error("encoding history: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Append-and-prune store over a single JSON file. The whole array is
/// rewritten on every record, so writers must be serialized by the caller;
/// in practice there is one recorder thread.
#[derive(Clone)]
pub struct HistoryStore {
    path: PathBuf,
    retention: Duration,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            path: path.into(),
            retention,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a point stamped with the current wall clock, prunes everything
    /// older than the retention window and writes the file back. Returns the
    /// number of points now stored.
    pub fn record(&self, download: f64, upload: f64) -> Result<usize, StoreError> {
        self.record_at(now_millis(), download, upload)
    }

    // Split out so tests can pin timestamps.
    pub(crate) fn record_at(
        &self,
        timestamp: i64,
        download: f64,
        upload: f64,
    ) -> Result<usize, StoreError> {
        let mut points = match self.read_points() {
            Ok(points) => points,
            Err(StoreError::Corrupt { path }) => {
                // Recording replaces garbage content with a fresh array;
                // only reads surface it as an error.
                warn!(path = %path.display(), "History file unreadable, starting over");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        points.push(SpeedPoint {
            timestamp,
            download,
            upload,
        });
        let cutoff = timestamp - self.retention.as_millis() as i64;
        points.retain(|p| p.timestamp >= cutoff);

        self.write_points(&points)?;
        Ok(points.len())
    }

    /// Every stored point, in file order. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<SpeedPoint>, StoreError> {
        self.read_points()
    }

    /// Removes the history file. Clearing an already-empty history is fine.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn read_points(&self) -> Result<Vec<SpeedPoint>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };

        let values: Vec<Value> = serde_json::from_slice(&raw).map_err(|_| StoreError::Corrupt {
            path: self.path.clone(),
        })?;

        // Individual elements that do not decode are dropped, not fatal; one
        // bad entry must not take the rest of the history with it.
        let mut points = Vec::with_capacity(values.len());
        let mut dropped = 0usize;
        for value in values {
            match serde_json::from_value::<SpeedPoint>(value) {
                Ok(point) => points.push(point),
                Err(_) => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, path = %self.path.display(), "Dropped malformed history entries");
        }
        Ok(points)
    }

    fn write_points(&self, points: &[SpeedPoint]) -> Result<(), StoreError> {
        let json = serde_json::to_vec(points).map_err(StoreError::Encode)?;
        fs::write(&self.path, json).map_err(|err| self.io_error(err))
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
