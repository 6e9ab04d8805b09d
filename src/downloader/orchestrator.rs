//! Batch orchestrator: worker pool, fetch policy and checkpoint update

use super::batch::{BatchResult, DateReport};
use super::config::{calculate_backoff, DownloaderConfig};
use super::progress::BatchProgress;
use super::DownloadError;
use crate::date_key::DateKey;
use crate::fetcher::failure::RetryContext;
use crate::fetcher::{
    Category, DownloadOutcome, FetcherError, HttpFetcher, ResourceFetcher, ResourceRequest,
};
use crate::metrics;
use crate::output::DataLayout;
use crate::resume::{CheckpointPolicy, CheckpointStore};
use crate::shutdown::SharedShutdown;
use futures::future::join_all;
use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Downloads batches of trading dates and maintains the checkpoint
pub struct BatchOrchestrator {
    config: DownloaderConfig,
    fetcher: Arc<dyn ResourceFetcher>,
    layout: DataLayout,
    store: CheckpointStore,
    shutdown: Option<SharedShutdown>,
}

impl BatchOrchestrator {
    /// Create an orchestrator around any fetcher implementation
    pub fn new(config: DownloaderConfig, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        let layout = DataLayout::new(config.data_dir());
        let store = CheckpointStore::new(config.checkpoint_file());
        Self {
            config,
            fetcher,
            layout,
            store,
            shutdown: None,
        }
    }

    /// Create an orchestrator fetching over HTTP from the configured archive
    pub fn from_config(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let fetcher = HttpFetcher::new(config.base_url(), config.fetch_timeout())?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Data folder layout
    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Checkpoint store
    pub fn checkpoint_store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Validate raw `ddMMyyyy` strings, failing on the first invalid one
    pub fn parse_dates(dates: &[String]) -> Result<Vec<DateKey>, DownloadError> {
        dates
            .iter()
            .map(|raw| DateKey::parse(raw).map_err(DownloadError::from))
            .collect()
    }

    /// Download every file for `dates` and return the saved paths
    ///
    /// Invalid dates are rejected before any I/O.
    pub async fn run_batch(&self, dates: &[String]) -> Result<Vec<PathBuf>, DownloadError> {
        let dates = Self::parse_dates(dates)?;
        Ok(self.run(&dates).await?.saved_paths)
    }

    /// Last fully downloaded date, if any
    pub fn get_checkpoint(&self) -> Result<Option<String>, DownloadError> {
        Ok(self.store.load()?.map(|date| date.to_string()))
    }

    /// Run one batch
    ///
    /// Dates are deduplicated and processed in calendar order by a fixed pool
    /// of workers. Fetch failures are reported in the result, never raised.
    ///
    /// # Errors
    ///
    /// Fails only if the data folders cannot be created or the checkpoint
    /// cannot be read (when the policy needs it) or written.
    pub async fn run(&self, dates: &[DateKey]) -> Result<BatchResult, DownloadError> {
        self.layout.ensure()?;

        let pending: VecDeque<DateKey> = dates
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let total = pending.len();
        let workers = self.config.concurrency().min(total.max(1));

        info!(
            dates = total,
            workers,
            root = %self.layout.root().display(),
            "Starting batch download"
        );

        let ctx = Arc::new(WorkerContext {
            fetcher: Arc::clone(&self.fetcher),
            layout: self.layout.clone(),
            fetch_timeout: self.config.fetch_timeout(),
            max_retries: self.config.max_retries(),
            shutdown: self.shutdown.clone(),
            queue: Mutex::new(pending),
            progress: BatchProgress::new(total),
        });

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            pool.spawn(run_worker(worker_id, Arc::clone(&ctx)));
        }

        let mut reports = Vec::with_capacity(total);
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(buffer) => reports.extend(buffer),
                Err(e) => return Err(DownloadError::Worker(e.to_string())),
            }
        }
        reports.sort_by(|a, b| a.date.cmp(&b.date));

        let skipped: Vec<DateKey> = ctx
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();

        let mut result = BatchResult {
            saved_paths: reports
                .iter()
                .flat_map(|report| report.saved_paths().cloned())
                .collect(),
            fully_successful: reports
                .iter()
                .filter(|report| report.is_fully_successful())
                .map(|report| report.date.clone())
                .collect(),
            reports,
            skipped,
            ..Default::default()
        };

        if ctx.shutdown_requested() {
            warn!(
                skipped = result.skipped.len(),
                "Shutdown requested - skipping remaining dates and the reference list"
            );
        } else {
            let reference = fetch_with_retry(&ctx, ResourceRequest::reference()).await;
            match &reference {
                DownloadOutcome::Saved(path) => result.saved_paths.push(path.clone()),
                DownloadOutcome::Unavailable => {
                    error!(category = %Category::Reference, "Reference list not found in archive")
                }
                DownloadOutcome::Failed(e) => {
                    error!(category = %Category::Reference, error = %e, "Failed to download reference list")
                }
            }
            result.reference = Some(reference);
        }

        let latest = result.latest_complete().cloned();
        result.checkpoint_written = self.update_checkpoint(latest).await?;

        info!(
            dates = total,
            complete = result.fully_successful.len(),
            incomplete = result.incomplete().count(),
            skipped = result.skipped.len(),
            files = result.saved_paths.len(),
            checkpoint = ?result.checkpoint_written.as_ref().map(DateKey::as_str),
            "Batch download finished"
        );

        Ok(result)
    }

    async fn update_checkpoint(
        &self,
        latest: Option<DateKey>,
    ) -> Result<Option<DateKey>, DownloadError> {
        let Some(latest) = latest else {
            debug!("No fully successful date, checkpoint unchanged");
            return Ok(None);
        };

        // Lock acquisition and fsync block, keep them off the runtime workers
        let store = self.store.clone();
        let policy = self.config.checkpoint_policy();
        tokio::task::spawn_blocking(move || resolve_and_save(&store, policy, &latest))
            .await
            .map_err(|e| DownloadError::Worker(e.to_string()))?
    }
}

fn resolve_and_save(
    store: &CheckpointStore,
    policy: CheckpointPolicy,
    latest: &DateKey,
) -> Result<Option<DateKey>, DownloadError> {
    let stored = if policy.needs_stored() {
        store.load()?
    } else {
        None
    };

    match policy.resolve(stored.as_ref(), latest) {
        Some(date) => {
            store.save(&date)?;
            metrics::record_checkpoint_write();
            Ok(Some(date))
        }
        None => {
            info!(
                stored = ?stored.as_ref().map(DateKey::as_str),
                batch_latest = %latest,
                policy = %policy,
                "Stored checkpoint is already later, leaving it unchanged"
            );
            Ok(None)
        }
    }
}

/// State shared by the workers of one batch
struct WorkerContext {
    fetcher: Arc<dyn ResourceFetcher>,
    layout: DataLayout,
    fetch_timeout: Duration,
    max_retries: u32,
    shutdown: Option<SharedShutdown>,
    queue: Mutex<VecDeque<DateKey>>,
    progress: BatchProgress,
}

impl WorkerContext {
    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }

    fn next_date(&self) -> Option<DateKey> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }
}

/// Pop dates until the queue is empty; returns this worker's reports
async fn run_worker(worker_id: usize, ctx: Arc<WorkerContext>) -> Vec<DateReport> {
    let mut reports = Vec::new();

    loop {
        if ctx.shutdown_requested() {
            debug!(worker_id, "Worker stopping on shutdown request");
            break;
        }
        let Some(date) = ctx.next_date() else {
            break;
        };

        debug!(worker_id, date = %date, "Processing date");
        let outcomes = join_all(
            ResourceRequest::for_date(&date)
                .into_iter()
                .map(|request| fetch_with_retry(&ctx, request)),
        )
        .await;

        let report = DateReport {
            date,
            outcomes: Category::DATE_SCOPED.iter().copied().zip(outcomes).collect(),
        };
        let complete = report.is_fully_successful();
        if !complete {
            if report.is_unavailable() {
                info!(
                    date = %report.date,
                    "Skipping date: no files in archive (likely holiday or invalid date)"
                );
            } else {
                let missing: Vec<String> = report
                    .missing()
                    .map(|(category, outcome)| format!("{category}: {}", outcome.label()))
                    .collect();
                info!(
                    date = %report.date,
                    missing = %missing.join(", "),
                    "Date incomplete, excluded from checkpoint"
                );
            }
        }

        metrics::record_date_completed(complete);
        if let Some(line) = ctx.progress.record(complete) {
            info!("{}", line);
        }
        reports.push(report);
    }

    reports
}

/// Fetch one resource under the time budget, retrying failures if configured
async fn fetch_with_retry(ctx: &WorkerContext, request: ResourceRequest) -> DownloadOutcome {
    let destination = ctx.layout.destination(&request);
    let mut retry_count = 0;

    loop {
        let outcome = match tokio::time::timeout(
            ctx.fetch_timeout,
            ctx.fetcher.fetch(&request, &destination),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    resource = %request,
                    timeout_ms = ctx.fetch_timeout.as_millis(),
                    "Fetch timed out"
                );
                DownloadOutcome::Failed(FetcherError::Timeout(ctx.fetch_timeout))
            }
        };

        let kind = match outcome {
            DownloadOutcome::Failed(ref e) => e.kind(),
            other => return other,
        };

        if ctx.max_retries == 0 {
            return outcome;
        }
        if retry_count >= ctx.max_retries || !kind.is_retryable() || ctx.shutdown_requested() {
            let context = RetryContext {
                attempt: retry_count + 1,
                max_attempts: retry_count + 1,
                kind,
                backoff: Duration::ZERO,
                resource: request.to_string(),
            };
            warn!("{}", context.format_failure());
            return outcome;
        }

        let backoff = calculate_backoff(retry_count);
        retry_count += 1;
        let context = RetryContext {
            attempt: retry_count,
            max_attempts: ctx.max_retries,
            kind,
            backoff,
            resource: request.to_string(),
        };
        warn!(
            resource = %request,
            retry_count,
            backoff_ms = backoff.as_millis(),
            "{}",
            context.format_retry()
        );
        metrics::record_retry_backoff(request.category(), backoff, retry_count);

        if let Some(shutdown) = &ctx.shutdown {
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {},
                _ = shutdown.wait_for_shutdown() => return outcome,
            }
        } else {
            tokio::time::sleep(backoff).await;
        }
    }
}
