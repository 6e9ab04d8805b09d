//! Command line definition and the download command

use crate::downloader::config::{
    DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, MAX_CONCURRENCY,
    MAX_RETRIES,
};
use crate::downloader::{BatchOrchestrator, BatchResult, DownloaderConfig};
use crate::fetcher::{DownloadOutcome, NSE_ARCHIVE_BASE_URL};
use crate::output::DEFAULT_DATA_DIR;
use crate::resume::{CheckpointPolicy, DEFAULT_CHECKPOINT_FILE};
use crate::shutdown::SharedShutdown;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::error;

use super::{CliError, LastDateCommand, ValidateCommand};

/// Parse and validate concurrency value
pub fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// NSE daily archive downloader
#[derive(Parser, Debug)]
#[command(name = "nse-data-downloader")]
#[command(about = "Download NSE daily archive files and track the last complete date", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Data root holding the stocks, indices, ma and broad folders
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Checkpoint record location
    #[arg(long, global = true, default_value = DEFAULT_CHECKPOINT_FILE)]
    pub checkpoint_file: PathBuf,

    /// Archive base URL
    #[arg(long, global = true, default_value = NSE_ARCHIVE_BASE_URL)]
    pub base_url: String,

    /// Number of dates downloaded in parallel (default: 5, max: 32)
    ///
    /// Each date issues three requests at once, so the archive sees up to
    /// three times this many concurrent requests.
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Retries for a failed file (default: 0, range: 0-10)
    ///
    /// Files missing from the archive are never retried.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u32).range(0..=MAX_RETRIES as i64))]
    pub max_retries: u32,

    /// Time budget for one file in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub fetch_timeout_secs: u64,

    /// How a batch updates the checkpoint: batch-max or monotonic
    #[arg(long, global = true, default_value = "batch-max")]
    pub checkpoint_policy: CheckpointPolicy,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Downloader configuration from the global flags
    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig::new()
            .with_data_dir(&self.data_dir)
            .with_checkpoint_file(&self.checkpoint_file)
            .with_base_url(&self.base_url)
            .with_concurrency(self.concurrency)
            .with_max_retries(self.max_retries)
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
            .with_checkpoint_policy(self.checkpoint_policy)
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download all archive files for the given dates
    Download(DownloadArgs),

    /// Print the last fully downloaded date
    LastDate(LastDateCommand),

    /// Validate dates or the checkpoint record
    Validate(ValidateCommand),
}

/// Download command arguments
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Trading dates in ddMMyyyy form, space or comma separated
    #[arg(required = true, num_args = 1.., value_delimiter = ',')]
    pub dates: Vec<String>,
}

impl DownloadArgs {
    /// Run one batch and print its summary
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let dates = BatchOrchestrator::parse_dates(&self.dates)?;
        let orchestrator =
            BatchOrchestrator::from_config(cli.downloader_config())?.with_shutdown(shutdown);

        let spinner = match cli.output_format {
            OutputFormat::Human => Some(create_spinner(dates.len())),
            OutputFormat::Json => None,
        };

        let result = orchestrator.run(&dates).await;

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let result = result.map_err(|e| {
            error!(error = %e, "Batch download failed");
            CliError::from(e)
        })?;

        match cli.output_format {
            OutputFormat::Json => output_json(&result),
            OutputFormat::Human => output_human(&result),
        }
        Ok(())
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

fn outcome_detail(outcome: &DownloadOutcome) -> String {
    match outcome {
        DownloadOutcome::Saved(path) => path.display().to_string(),
        DownloadOutcome::Unavailable => "not found in archive".to_string(),
        DownloadOutcome::Failed(e) => e.to_string(),
    }
}

/// Batch summary as a JSON value
pub fn summary_json(result: &BatchResult) -> serde_json::Value {
    let dates: Vec<serde_json::Value> = result
        .reports
        .iter()
        .map(|report| {
            let files: serde_json::Map<String, serde_json::Value> = report
                .outcomes
                .iter()
                .map(|(category, outcome)| {
                    (
                        category.folder().to_string(),
                        serde_json::json!({
                            "outcome": outcome.label(),
                            "detail": outcome_detail(outcome),
                        }),
                    )
                })
                .collect();
            serde_json::json!({
                "date": report.date,
                "complete": report.is_fully_successful(),
                "files": files,
            })
        })
        .collect();

    serde_json::json!({
        "success": true,
        "saved": result.saved_paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "complete_dates": result.fully_successful,
        "skipped_dates": result.skipped,
        "reference": result.reference.as_ref().map(DownloadOutcome::label),
        "checkpoint_written": result.checkpoint_written,
        "dates": dates,
    })
}

fn output_json(result: &BatchResult) {
    println!("{}", summary_json(result));
}

fn output_human(result: &BatchResult) {
    println!("\nBatch download finished");
    println!("Dates processed: {}", result.reports.len());
    println!("Complete dates: {}", result.fully_successful.len());
    println!("Files saved: {}", result.saved_paths.len());

    for report in result.incomplete() {
        if report.is_unavailable() {
            println!("  {} skipped: no files in archive (holiday?)", report.date);
            continue;
        }
        println!("  {} incomplete:", report.date);
        for (category, outcome) in report.missing() {
            println!("    {category}: {}", outcome_detail(outcome));
        }
    }

    if !result.skipped.is_empty() {
        println!("Not started (shutdown): {}", result.skipped.len());
    }

    match &result.reference {
        Some(DownloadOutcome::Saved(_)) | None => {}
        Some(outcome) => println!("Reference list: {}", outcome_detail(outcome)),
    }

    match &result.checkpoint_written {
        Some(date) => println!("Checkpoint: {date}"),
        None => println!("Checkpoint: unchanged"),
    }
}

/// Spinner shown while a batch runs
fn create_spinner(total_dates: usize) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Downloading {total_dates} date(s)"));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
