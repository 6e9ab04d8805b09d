//! Checkpoint record and update policy

use crate::date_key::DateKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted checkpoint record
///
/// Serialized as `{ "lastDate": "ddMMyyyy" }`, the format earlier versions
/// of the downloader wrote to `last-success.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    #[serde(rename = "lastDate", default)]
    last_date: Option<DateKey>,
}

impl CheckpointRecord {
    /// Record holding `date`
    pub fn new(date: DateKey) -> Self {
        Self {
            last_date: Some(date),
        }
    }

    /// Last fully downloaded date, if set
    pub fn last_date(&self) -> Option<&DateKey> {
        self.last_date.as_ref()
    }

    /// Consume the record
    pub fn into_last_date(self) -> Option<DateKey> {
        self.last_date
    }
}

/// How a finished batch updates the stored checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointPolicy {
    /// Overwrite with the latest complete date of the current batch, even
    /// if the stored date is later
    #[default]
    BatchMaximum,
    /// Only ever move the checkpoint forward
    Monotonic,
}

impl CheckpointPolicy {
    /// Date to write after a batch whose latest complete date is `batch_max`
    ///
    /// Returns `None` when the stored checkpoint should be left alone.
    pub fn resolve(&self, stored: Option<&DateKey>, batch_max: &DateKey) -> Option<DateKey> {
        match (self, stored) {
            (CheckpointPolicy::Monotonic, Some(stored)) if stored >= batch_max => None,
            _ => Some(batch_max.clone()),
        }
    }

    /// Whether resolving needs the stored value
    pub fn needs_stored(&self) -> bool {
        matches!(self, CheckpointPolicy::Monotonic)
    }
}

impl fmt::Display for CheckpointPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointPolicy::BatchMaximum => f.write_str("batch-max"),
            CheckpointPolicy::Monotonic => f.write_str("monotonic"),
        }
    }
}

impl FromStr for CheckpointPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batch-max" => Ok(CheckpointPolicy::BatchMaximum),
            "monotonic" => Ok(CheckpointPolicy::Monotonic),
            _ => Err(format!(
                "Invalid checkpoint policy: {s}. Valid options: batch-max, monotonic"
            )),
        }
    }
}
