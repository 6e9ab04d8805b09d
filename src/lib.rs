//! # NSE Data Downloader Library
//!
//! Batch downloader for the National Stock Exchange of India's daily
//! archives. For every requested trading date it fetches three files (the
//! full per-symbol bhavcopy, the closing values of all indices and the market
//! activity report), fetches the Nifty 50 constituent list once per batch,
//! and records the latest date whose files all arrived so the next run knows
//! where to resume.
//!
//! ## Features
//!
//! - **Bounded Concurrency**: A fixed pool of workers shares one queue of
//!   dates; at most three requests per worker are in flight
//! - **No Partial Files**: Bodies stream to a temporary sibling file and are
//!   renamed into place only when complete
//! - **Holiday Aware**: Files missing from the archive are reported, not
//!   treated as errors
//! - **Durable Checkpoint**: `{"lastDate": "ddMMyyyy"}` written atomically
//!   under an advisory lock
//!
//! ## Quick Start
//!
//! ```no_run
//! use nse_data_downloader::date_key::DateKey;
//! use nse_data_downloader::downloader::{BatchOrchestrator, DownloaderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloaderConfig::new().with_concurrency(5);
//! let orchestrator = BatchOrchestrator::from_config(config)?;
//!
//! let dates = vec![DateKey::parse("14032024")?, DateKey::parse("15032024")?];
//! let result = orchestrator.run(&dates).await?;
//! println!("complete: {:?}", result.fully_successful);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`date_key`] - `ddMMyyyy` trading date keys with calendar ordering
//! - [`fetcher`] - Resource URLs and the streaming HTTP fetcher
//! - [`output`] - Data folder layout
//! - [`resume`] - Checkpoint record, update policy and atomic store
//! - [`downloader`] - Batch orchestration over a worker pool
//! - [`cli`] - Command line interface
//!
//! ## Output Layout
//!
//! ```text
//! <data-dir>/stocks/<ddMMyyyy>.csv
//! <data-dir>/indices/<ddMMyyyy>.csv
//! <data-dir>/ma/<ddMMyyyy>.csv
//! <data-dir>/broad/nifty50list.csv
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CLI command implementations
pub mod cli;

/// Trading date keys
pub mod date_key;

/// Batch download orchestration
pub mod downloader;

/// Archive fetchers
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Data folder layout
pub mod output;

/// Resume checkpoint for batch runs
pub mod resume;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

// Re-export commonly used types
pub use date_key::{DateKey, DateKeyError};
pub use downloader::{BatchOrchestrator, BatchResult, DownloadError, DownloaderConfig};
pub use fetcher::{Category, DownloadOutcome, ResourceFetcher, ResourceRequest};
