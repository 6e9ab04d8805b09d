//! CLI command implementations

pub mod download;
pub mod error;
pub mod last_date;
pub mod validate;

pub use download::{Cli, Commands, DownloadArgs, OutputFormat};
pub use error::CliError;
pub use last_date::LastDateCommand;
pub use validate::{ValidateCommand, ValidateTarget};
