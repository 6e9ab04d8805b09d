//! Validation subcommand

use super::download::Cli;
use super::CliError;
use crate::date_key::DateKey;
use crate::resume::{CheckpointStore, MAX_RECORD_SIZE};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Validate command for checking dates and the checkpoint record
#[derive(Parser, Debug)]
pub struct ValidateCommand {
    /// What to validate
    #[command(subcommand)]
    pub target: ValidateTarget,
}

/// Target type for validation
#[derive(clap::Subcommand, Debug)]
pub enum ValidateTarget {
    /// Check that dates are real ddMMyyyy calendar dates
    Dates {
        /// Dates to check, space or comma separated
        #[arg(required = true, num_args = 1.., value_delimiter = ',')]
        dates: Vec<String>,
    },
    /// Check that the checkpoint record can be read
    Checkpoint {
        /// Record to check (defaults to --checkpoint-file)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

impl ValidateCommand {
    /// Execute the validation command
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        match &self.target {
            ValidateTarget::Dates { dates } => self.validate_dates(dates),
            ValidateTarget::Checkpoint { path } => {
                let path = path.as_ref().unwrap_or(&cli.checkpoint_file);
                self.validate_checkpoint(path)
            }
        }
    }

    fn validate_dates(&self, dates: &[String]) -> Result<(), CliError> {
        let mut invalid_count = 0;
        for raw in dates {
            match DateKey::parse(raw) {
                Ok(date) => println!(
                    "  - {} valid ({}, archive short form {})",
                    date,
                    date.date().format("%Y-%m-%d"),
                    date.compact()
                ),
                Err(e) => {
                    println!("  - {raw} invalid: {e}");
                    invalid_count += 1;
                }
            }
        }

        if invalid_count > 0 {
            return Err(CliError::InvalidArgument(format!(
                "Found {invalid_count} invalid date(s)"
            )));
        }
        println!("All {} date(s) valid", dates.len());
        Ok(())
    }

    fn validate_checkpoint(&self, path: &Path) -> Result<(), CliError> {
        if !path.exists() {
            println!("No checkpoint recorded at {}", path.display());
            return Ok(());
        }

        match CheckpointStore::new(path).load() {
            Ok(Some(date)) => {
                println!("Checkpoint at {} is valid: {}", path.display(), date);
                Ok(())
            }
            Ok(None) => {
                println!("Checkpoint at {} is valid but holds no date", path.display());
                Ok(())
            }
            Err(e) => {
                println!("Checkpoint at {} is invalid: {}", path.display(), e);
                println!("  Records are JSON like {{\"lastDate\": \"15032024\"}}, at most {MAX_RECORD_SIZE} bytes");
                Err(CliError::from(e))
            }
        }
    }
}
