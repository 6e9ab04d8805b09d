//! Batch results

use crate::date_key::DateKey;
use crate::fetcher::{Category, DownloadOutcome};
use std::path::PathBuf;

/// What happened to one date of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateReport {
    /// The date
    pub date: DateKey,
    /// Outcome per date-scoped category, in [`Category::DATE_SCOPED`] order
    pub outcomes: Vec<(Category, DownloadOutcome)>,
}

impl DateReport {
    /// Whether every date-scoped file was saved
    pub fn is_fully_successful(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|(_, outcome)| outcome.is_saved())
    }

    /// Whether the archive had none of the files (holiday or future date)
    pub fn is_unavailable(&self) -> bool {
        !self.outcomes.is_empty()
            && self
                .outcomes
                .iter()
                .all(|(_, outcome)| matches!(outcome, DownloadOutcome::Unavailable))
    }

    /// Saved paths for this date
    pub fn saved_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.outcomes.iter().filter_map(|(_, outcome)| match outcome {
            DownloadOutcome::Saved(path) => Some(path),
            _ => None,
        })
    }

    /// Categories that were not saved, with their outcome
    pub fn missing(&self) -> impl Iterator<Item = &(Category, DownloadOutcome)> {
        self.outcomes.iter().filter(|(_, outcome)| !outcome.is_saved())
    }
}

/// Result of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Every file saved during the batch, Reference included
    pub saved_paths: Vec<PathBuf>,
    /// Dates whose three date-scoped files were all saved, ascending
    pub fully_successful: Vec<DateKey>,
    /// Per-date detail, ascending by date
    pub reports: Vec<DateReport>,
    /// Reference fetch outcome; `None` if the batch stopped before fetching it
    pub reference: Option<DownloadOutcome>,
    /// Checkpoint value written at the end of the batch
    pub checkpoint_written: Option<DateKey>,
    /// Dates never started because shutdown was requested
    pub skipped: Vec<DateKey>,
}

impl BatchResult {
    /// Calendar-latest fully successful date
    pub fn latest_complete(&self) -> Option<&DateKey> {
        self.fully_successful.iter().max()
    }

    /// Dates that were processed but are not fully successful
    pub fn incomplete(&self) -> impl Iterator<Item = &DateReport> {
        self.reports.iter().filter(|report| !report.is_fully_successful())
    }
}
