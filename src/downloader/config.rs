//! Download configuration constants and [`DownloaderConfig`]

use crate::fetcher::NSE_ARCHIVE_BASE_URL;
use crate::output::DEFAULT_DATA_DIR;
use crate::resume::{CheckpointPolicy, DEFAULT_CHECKPOINT_FILE};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of concurrent date workers.
/// Each worker keeps up to three fetches in flight, so 5 workers means at
/// most 15 concurrent requests against the archive.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Upper bound accepted for the worker count.
pub const MAX_CONCURRENCY: usize = 32;

/// Default overall time budget for one fetch, body included.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Default number of retries for a failed fetch. Zero keeps one attempt per file.
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Upper bound accepted for the retry count.
pub const MAX_RETRIES: u32 = 10;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(retry_count));
    let delay_ms = delay_ms.min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}

/// Everything a batch run needs, passed in at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    data_dir: PathBuf,
    checkpoint_file: PathBuf,
    base_url: String,
    concurrency: usize,
    fetch_timeout: Duration,
    max_retries: u32,
    checkpoint_policy: CheckpointPolicy,
}

impl DownloaderConfig {
    /// Configuration with all defaults
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            checkpoint_file: PathBuf::from(DEFAULT_CHECKPOINT_FILE),
            base_url: NSE_ARCHIVE_BASE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            checkpoint_policy: CheckpointPolicy::default(),
        }
    }

    /// Set the data root
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the checkpoint record location
    pub fn with_checkpoint_file(mut self, checkpoint_file: impl Into<PathBuf>) -> Self {
        self.checkpoint_file = checkpoint_file.into();
        self
    }

    /// Set the archive base URL; a trailing slash is dropped
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the worker count, clamped to `1..=MAX_CONCURRENCY`
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set the per-fetch time budget
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Set the retry count for failed fetches, capped at `MAX_RETRIES`
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(MAX_RETRIES);
        self
    }

    /// Set how the checkpoint is updated after a batch
    pub fn with_checkpoint_policy(mut self, policy: CheckpointPolicy) -> Self {
        self.checkpoint_policy = policy;
        self
    }

    /// Data root
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Checkpoint record location
    pub fn checkpoint_file(&self) -> &Path {
        &self.checkpoint_file
    }

    /// Archive base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Worker count
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Per-fetch time budget
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Retries per failed fetch
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Checkpoint update policy
    pub fn checkpoint_policy(&self) -> CheckpointPolicy {
        self.checkpoint_policy
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self::new()
    }
}
