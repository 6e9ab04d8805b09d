//! CLI error types and conversions

use crate::date_key::DateKeyError;
use crate::downloader::DownloadError;
use crate::resume::CheckpointError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Date error
    #[error("date error: {0}")]
    DateError(#[from] DateKeyError),

    /// Download error
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Checkpoint error
    #[error("checkpoint error: {0}")]
    CheckpointError(#[from] CheckpointError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Metrics exporter could not be started
    #[error("metrics error: {0}")]
    MetricsError(String),
}
