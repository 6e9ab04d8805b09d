//! Local storage of downloaded archive files

pub mod layout;

pub use layout::{DataLayout, DEFAULT_DATA_DIR};

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
