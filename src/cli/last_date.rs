//! `last-date` command

use super::download::{Cli, OutputFormat};
use super::CliError;
use crate::resume::CheckpointStore;
use clap::Parser;

/// Print the last fully downloaded date
#[derive(Parser, Debug)]
pub struct LastDateCommand {}

impl LastDateCommand {
    /// Read the checkpoint named by the global flags and print it
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let store = CheckpointStore::new(&cli.checkpoint_file);
        let last_date = store.load()?;

        match cli.output_format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "lastDate": last_date }));
            }
            OutputFormat::Human => match last_date {
                Some(date) => println!("{date}"),
                None => println!("No checkpoint recorded at {}", store.path().display()),
            },
        }
        Ok(())
    }
}
