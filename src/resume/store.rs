//! Durable checkpoint storage
//!
//! Atomic replace via a same-directory temporary file, fsync, rename; with
//! advisory locking so separate processes sharing one record never observe
//! a partial write.

use super::checkpoint::CheckpointRecord;
use super::lock::{open_lock, parent_dir};
use crate::date_key::DateKey;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default checkpoint file, relative to the working directory
pub const DEFAULT_CHECKPOINT_FILE: &str = "last-success.json";

/// Maximum accepted record size (1 MiB); a real record is a few dozen bytes
pub const MAX_RECORD_SIZE: u64 = 1024 * 1024;

/// File-backed store for the last fully downloaded date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Store backed by the record at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Record location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `date`, replacing any previous value
    pub fn save(&self, date: &DateKey) -> Result<(), CheckpointError> {
        let path = self.path.as_path();
        debug!(path = %path.display(), date = %date, "Saving checkpoint");

        let json = serde_json::to_string_pretty(&CheckpointRecord::new(date.clone()))
            .map_err(|e| CheckpointError::SerializationError(e.to_string()))?;

        let mut lock = open_lock(path)?;
        let _guard = lock
            .write()
            .map_err(|e| CheckpointError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let dir = parent_dir(path);
        let mut temp_file = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| CheckpointError::IoError(format!("Failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| CheckpointError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| CheckpointError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| CheckpointError::IoError(format!("Failed to sync temp file: {e}")))?;

        temp_file
            .persist(path)
            .map_err(|e| CheckpointError::IoError(format!("Failed to persist temp file: {e}")))?;

        // Make the rename itself durable
        if let Ok(dir) = std::fs::File::open(dir) {
            let _ = dir.sync_all();
        }

        info!(path = %path.display(), date = %date, "Checkpoint saved");
        Ok(())
    }

    /// Read the stored date
    ///
    /// Returns `Ok(None)` when nothing has been saved yet. A record that exists
    /// but cannot be read or parsed is an error.
    pub fn load(&self) -> Result<Option<DateKey>, CheckpointError> {
        let path = self.path.as_path();
        if !path.exists() {
            debug!(path = %path.display(), "No checkpoint recorded yet");
            return Ok(None);
        }

        let lock = open_lock(path)?;
        let _guard = lock
            .read()
            .map_err(|e| CheckpointError::LockError(format!("Failed to acquire read lock: {e}")))?;

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CheckpointError::IoError(e.to_string())),
        };
        if metadata.len() > MAX_RECORD_SIZE {
            return Err(CheckpointError::RecordTooLarge {
                size: metadata.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| CheckpointError::IoError(e.to_string()))?;

        let record: CheckpointRecord = serde_json::from_str(&contents).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to deserialize checkpoint");
            CheckpointError::DeserializationError(e.to_string())
        })?;

        debug!(path = %path.display(), last_date = ?record.last_date(), "Checkpoint loaded");
        Ok(record.into_last_date())
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_FILE)
    }
}

/// Errors related to checkpoint storage
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Record file too large
    #[error("checkpoint record too large: {size} bytes (max: {max} bytes)")]
    RecordTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}
