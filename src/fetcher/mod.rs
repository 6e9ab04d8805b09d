//! Archive fetchers
//!
//! A fetcher performs one request for one archive file and streams it to a
//! destination path, reporting a [`DownloadOutcome`]. The orchestrator only
//! depends on the [`ResourceFetcher`] trait; [`http::HttpFetcher`] is the
//! production implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod failure;
pub mod http;
pub mod resource;

pub use failure::FailureKind;
pub use http::HttpFetcher;
pub use resource::{Category, ResourceError, ResourceRequest, NSE_ARCHIVE_BASE_URL};

/// Fetcher errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetcherError {
    /// Archive answered with a non-success status other than 404
    #[error("HTTP {status}: {kind}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Classified failure
        kind: FailureKind,
    },

    /// Request could not be sent or the body stream broke
    #[error("network error ({kind}): {message}")]
    Network {
        /// Classified failure
        kind: FailureKind,
        /// Underlying error text
        message: String,
    },

    /// Fetch exceeded its time budget
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Writing the body to disk failed
    #[error("IO error: {0}")]
    Io(String),

    /// HTTP client could not be constructed
    #[error("client setup failed: {0}")]
    ClientSetup(String),
}

impl FetcherError {
    /// Failure classification for logging and retry decisions
    pub fn kind(&self) -> FailureKind {
        match self {
            FetcherError::HttpStatus { kind, .. } | FetcherError::Network { kind, .. } => *kind,
            FetcherError::Timeout(_) => FailureKind::Timeout,
            FetcherError::Io(_) | FetcherError::ClientSetup(_) => FailureKind::Io,
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Result of fetching one archive file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File fully written at this path
    Saved(PathBuf),
    /// Archive has no such file (holiday or future date)
    Unavailable,
    /// Transient-class failure; no file was left at the destination
    Failed(FetcherError),
}

impl DownloadOutcome {
    /// Whether the file was saved
    pub fn is_saved(&self) -> bool {
        matches!(self, DownloadOutcome::Saved(_))
    }

    /// Saved path, if any
    pub fn saved_path(&self) -> Option<&Path> {
        match self {
            DownloadOutcome::Saved(path) => Some(path),
            _ => None,
        }
    }

    /// Short label used for metrics and summaries
    pub fn label(&self) -> &'static str {
        match self {
            DownloadOutcome::Saved(_) => "saved",
            DownloadOutcome::Unavailable => "unavailable",
            DownloadOutcome::Failed(_) => "failed",
        }
    }
}

/// Fetches one archive resource to a local path
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Download `request` to `destination`
    ///
    /// Implementations must leave nothing at `destination` unless the
    /// outcome is [`DownloadOutcome::Saved`].
    async fn fetch(&self, request: &ResourceRequest, destination: &Path) -> DownloadOutcome;
}
