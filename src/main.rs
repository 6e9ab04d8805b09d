//! Main entry point for the nse-data-downloader CLI

use clap::Parser;
use nse_data_downloader::cli::{Cli, CliError, Commands};
use nse_data_downloader::metrics;
use nse_data_downloader::shutdown::ShutdownCoordinator;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nse_data_downloader=info"));

    // Logs go to stderr so stdout stays parseable with --output-format json
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(addr) = cli.metrics_addr {
        metrics::init_metrics(addr)
            .await
            .map_err(|e| CliError::MetricsError(e.to_string()))?;
    }

    // Ctrl+C stops workers from starting new dates; in-flight files finish
    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing dates in progress...");
                shutdown.request_shutdown();
            }
        }
    });

    match cli.command {
        Commands::Download(ref args) => args.execute(&cli, shutdown).await?,
        Commands::LastDate(ref cmd) => cmd.execute(&cli)?,
        Commands::Validate(ref cmd) => cmd.execute(&cli)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
