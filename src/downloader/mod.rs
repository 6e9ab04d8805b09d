//! Batch download orchestration
//!
//! This module turns a list of trading dates into files on disk and a
//! checkpoint record.
//!
//! # Overview
//!
//! 1. **Configuration**: [`config::DownloaderConfig`] carries the data root,
//!    checkpoint location, archive URL, worker count, timeouts and retries
//! 2. **Execution**: [`orchestrator::BatchOrchestrator`] runs a fixed pool of
//!    workers over a shared queue of dates, three fetches per date
//! 3. **Progress**: [`progress::BatchProgress`] logs completed dates
//! 4. **Result**: [`batch::BatchResult`] lists saved files, complete dates and
//!    the checkpoint that was written
//!
//! # Quick Start
//!
//! ```no_run
//! use nse_data_downloader::downloader::{BatchOrchestrator, DownloaderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloaderConfig::new().with_data_dir("./NSE-Data");
//! let orchestrator = BatchOrchestrator::from_config(config)?;
//!
//! let saved = orchestrator
//!     .run_batch(&["14032024".to_string(), "15032024".to_string()])
//!     .await?;
//! println!("saved {} files", saved.len());
//! println!("checkpoint: {:?}", orchestrator.get_checkpoint()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Individual fetch failures never fail a batch; they show up in the
//! [`batch::DateReport`]s. A batch fails only when its inputs are invalid,
//! the data folders cannot be created, or the checkpoint cannot be written.

pub mod batch;
pub mod config;
pub mod orchestrator;
pub mod progress;

pub use batch::{BatchResult, DateReport};
pub use config::DownloaderConfig;
pub use orchestrator::BatchOrchestrator;
pub use progress::BatchProgress;

use crate::date_key::DateKeyError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::resume::CheckpointError;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// A requested date is not a valid `ddMMyyyy` date
    #[error("validation error: {0}")]
    Validation(#[from] DateKeyError),

    /// Data folders could not be created
    #[error("layout error: {0}")]
    Layout(#[from] OutputError),

    /// Checkpoint could not be read or written
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// HTTP client could not be constructed
    #[error("fetcher setup error: {0}")]
    Setup(#[from] FetcherError),

    /// A worker task panicked or was cancelled
    #[error("worker error: {0}")]
    Worker(String),
}
