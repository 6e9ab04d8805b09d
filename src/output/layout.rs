//! On-disk folder layout for archive files
//!
//! Files land at `<root>/<category folder>/<file name>`:
//!
//! ```text
//! .data/NSE-Data/
//!   stocks/15032024.csv
//!   indices/15032024.csv
//!   ma/15032024.csv
//!   broad/nifty50list.csv
//! ```
//!
//! # Usage Example
//!
//! ```rust
//! use nse_data_downloader::date_key::DateKey;
//! use nse_data_downloader::fetcher::{Category, ResourceRequest};
//! use nse_data_downloader::output::DataLayout;
//!
//! let layout = DataLayout::new("data");
//! let date = DateKey::parse("15032024").unwrap();
//! let request = ResourceRequest::dated(Category::MonthlyAggregate, date).unwrap();
//! assert!(layout.destination(&request).ends_with("ma/15032024.csv"));
//! ```

use super::{OutputError, OutputResult};
use crate::fetcher::{Category, ResourceRequest};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default data root, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = ".data/NSE-Data";

/// Root directory plus the fixed category folders beneath it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// Create a layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding files of `category`
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.folder())
    }

    /// Local path a request is stored under
    pub fn destination(&self, request: &ResourceRequest) -> PathBuf {
        self.category_dir(request.category()).join(request.file_name())
    }

    /// Create the root and every category folder if missing
    ///
    /// Idempotent and safe to race against other callers: a folder that
    /// already exists counts as success. Any other filesystem error is
    /// returned.
    pub fn ensure(&self) -> OutputResult<()> {
        for category in Category::ALL {
            let dir = self.category_dir(category);
            std::fs::create_dir_all(&dir).map_err(|e| {
                OutputError::IoError(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        debug!(root = %self.root.display(), "Data layout ready");
        Ok(())
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
