//! Observability metrics for archive downloads
//!
//! ## Architecture
//!
//! - Uses the `metrics` crate facade; recording is a no-op until a recorder
//!   is installed
//! - Optional Prometheus exporter serving a scrape endpoint
//! - Per-fetch timing via [`FetchMetrics`], batch-level counters via free
//!   functions

use crate::fetcher::{Category, DownloadOutcome};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls after a successful one are ignored.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "fetches_total",
        Unit::Count,
        "Archive fetches by category and outcome"
    );

    describe_histogram!(
        "fetch_duration_seconds",
        Unit::Seconds,
        "Archive fetch duration in seconds"
    );

    describe_gauge!(
        "fetches_in_flight",
        Unit::Count,
        "Archive fetches currently in progress"
    );

    describe_counter!(
        "fetch_retries_total",
        Unit::Count,
        "Total number of fetch retry attempts"
    );

    describe_counter!(
        "dates_completed_total",
        Unit::Count,
        "Requested dates processed, by status"
    );

    describe_counter!(
        "checkpoint_writes_total",
        Unit::Count,
        "Checkpoint records written"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Timing and outcome of one archive fetch
///
/// Holds the in-flight gauge up for its lifetime.
pub struct FetchMetrics {
    category: Category,
    start_time: Instant,
}

impl FetchMetrics {
    /// Start recording a fetch
    pub fn start(category: Category) -> Self {
        gauge!("fetches_in_flight").increment(1.0);
        Self {
            category,
            start_time: Instant::now(),
        }
    }

    /// Record the outcome of the fetch
    pub fn record(&self, outcome: &DownloadOutcome) {
        let duration = self.start_time.elapsed();

        counter!(
            "fetches_total",
            "category" => self.category.folder(),
            "outcome" => outcome.label(),
        )
        .increment(1);

        histogram!(
            "fetch_duration_seconds",
            "category" => self.category.folder(),
        )
        .record(duration.as_secs_f64());

        debug!(
            category = %self.category,
            outcome = outcome.label(),
            duration_ms = duration.as_millis(),
            "Fetch recorded"
        );
    }
}

impl Drop for FetchMetrics {
    fn drop(&mut self) {
        gauge!("fetches_in_flight").decrement(1.0);
    }
}

/// Record a retry backoff before another attempt
pub fn record_retry_backoff(category: Category, duration: Duration, attempt: u32) {
    counter!(
        "fetch_retries_total",
        "category" => category.folder(),
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    debug!(
        category = %category,
        attempt = attempt,
        backoff_ms = duration.as_millis(),
        "Retry backoff recorded"
    );
}

/// Record one processed date
pub fn record_date_completed(fully_successful: bool) {
    let status = if fully_successful { "complete" } else { "incomplete" };
    counter!("dates_completed_total", "status" => status).increment(1);
}

/// Record a checkpoint write
pub fn record_checkpoint_write() {
    counter!("checkpoint_writes_total").increment(1);
}
