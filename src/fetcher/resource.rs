//! Archive resource resolution
//!
//! Maps a (category, date) pair to the remote archive URL and the local file
//! it is stored under. Everything here is pure: no I/O, no clock.

use crate::date_key::DateKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default archive host
pub const NSE_ARCHIVE_BASE_URL: &str = "https://archives.nseindia.com";

/// File name used for the reference (index constituents) resource
pub const REFERENCE_FILE_NAME: &str = "nifty50list.csv";

/// Kind of archive file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Full per-symbol bhavcopy for a trading day
    PerSymbol,
    /// Closing values of all indices for a trading day
    IndexClose,
    /// Market activity report for a trading day
    MonthlyAggregate,
    /// Nifty 50 constituent list, independent of the date
    Reference,
}

impl Category {
    /// Categories fetched once per requested date
    pub const DATE_SCOPED: [Category; 3] = [
        Category::PerSymbol,
        Category::IndexClose,
        Category::MonthlyAggregate,
    ];

    /// Every category, in folder order
    pub const ALL: [Category; 4] = [
        Category::PerSymbol,
        Category::IndexClose,
        Category::MonthlyAggregate,
        Category::Reference,
    ];

    /// Whether the remote file depends on a date
    pub fn is_date_scoped(&self) -> bool {
        !matches!(self, Category::Reference)
    }

    /// Folder name under the data root. Downstream readers locate files by
    /// this name, so these must not change.
    pub fn folder(&self) -> &'static str {
        match self {
            Category::PerSymbol => "stocks",
            Category::IndexClose => "indices",
            Category::MonthlyAggregate => "ma",
            Category::Reference => "broad",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// One downloadable archive file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRequest {
    category: Category,
    date: Option<DateKey>,
}

impl ResourceRequest {
    /// Request a date-scoped file
    ///
    /// # Errors
    ///
    /// Returns an error for [`Category::Reference`], which has no date.
    pub fn dated(category: Category, date: DateKey) -> Result<Self, ResourceError> {
        if !category.is_date_scoped() {
            return Err(ResourceError::UnexpectedDate(category));
        }
        Ok(Self {
            category,
            date: Some(date),
        })
    }

    /// Request the date-independent reference file
    pub fn reference() -> Self {
        Self {
            category: Category::Reference,
            date: None,
        }
    }

    /// All date-scoped requests for one date
    pub fn for_date(date: &DateKey) -> Vec<Self> {
        Category::DATE_SCOPED
            .iter()
            .map(|category| Self {
                category: *category,
                date: Some(date.clone()),
            })
            .collect()
    }

    /// File category
    pub fn category(&self) -> Category {
        self.category
    }

    /// Date, for date-scoped requests
    pub fn date(&self) -> Option<&DateKey> {
        self.date.as_ref()
    }

    /// Local file name inside the category folder
    pub fn file_name(&self) -> String {
        match &self.date {
            Some(date) => format!("{date}.csv"),
            None => REFERENCE_FILE_NAME.to_string(),
        }
    }

    /// Remote URL under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match (&self.category, &self.date) {
            (Category::PerSymbol, Some(date)) => {
                format!("{base}/products/content/sec_bhavdata_full_{date}.csv")
            }
            (Category::IndexClose, Some(date)) => {
                format!("{base}/content/indices/ind_close_all_{date}.csv")
            }
            (Category::MonthlyAggregate, Some(date)) => {
                format!("{base}/archives/equities/mkt/MA{}.csv", date.compact())
            }
            // Constructors guarantee date-scoped categories carry a date
            _ => format!("{base}/content/indices/ind_nifty50list.csv"),
        }
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.date {
            Some(date) => write!(f, "{}/{}", self.category, date),
            None => write!(f, "{}", self.category),
        }
    }
}

/// Resource construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// A date was supplied for a date-independent category
    #[error("category '{0}' does not take a date")]
    UnexpectedDate(Category),
}
