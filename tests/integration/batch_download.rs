//! Integration tests for batch orchestration against a scripted fetcher
//!
//! Tests verify:
//! - Bounded number of concurrent fetches
//! - Holiday dates excluded from the checkpoint
//! - Input order does not matter
//! - Reference failures do not block the checkpoint
//! - Timeouts, retries and checkpoint policies
//! - A download stalled mid-body leaves no file behind

use async_trait::async_trait;
use nse_data_downloader::downloader::{BatchOrchestrator, DownloaderConfig};
use nse_data_downloader::fetcher::{
    Category, DownloadOutcome, FailureKind, FetcherError, ResourceFetcher, ResourceRequest,
};
use nse_data_downloader::resume::{CheckpointPolicy, CheckpointStore};
use nse_data_downloader::shutdown::{ShutdownCoordinator, SharedShutdown};
use nse_data_downloader::DateKey;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Scripted response for one resource
#[derive(Debug, Clone, Copy)]
enum Behavior {
    Save,
    Unavailable,
    Fail,
    Hang,
    /// Fail on the first attempt, save afterwards
    FailOnce,
}

/// In-memory fetcher: saves a small CSV unless scripted otherwise
struct ScriptedFetcher {
    rules: HashMap<(Category, Option<String>), Behavior>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<ResourceRequest>>,
    shutdown_on_first_call: Option<SharedShutdown>,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            rules: HashMap::new(),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            shutdown_on_first_call: None,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Script every date-scoped file of `date`
    fn date(mut self, date: &str, behavior: Behavior) -> Self {
        for category in Category::DATE_SCOPED {
            self.rules.insert((category, Some(date.to_string())), behavior);
        }
        self
    }

    fn file(mut self, category: Category, date: &str, behavior: Behavior) -> Self {
        self.rules.insert((category, Some(date.to_string())), behavior);
        self
    }

    fn reference(mut self, behavior: Behavior) -> Self {
        self.rules.insert((Category::Reference, None), behavior);
        self
    }

    fn shutdown_on_first_call(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown_on_first_call = Some(shutdown);
        self
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn calls_for(&self, category: Category, date: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.category() == category && r.date().map(|d| d.as_str()) == Some(date))
            .count()
    }

    fn date_scoped_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.date().is_some())
            .count()
    }
}

#[async_trait]
impl ResourceFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &ResourceRequest, destination: &Path) -> DownloadOutcome {
        let previous_calls = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls
                .iter()
                .filter(|r| *r == request)
                .count()
                - 1
        };
        if let Some(shutdown) = &self.shutdown_on_first_call {
            shutdown.request_shutdown();
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let key = (request.category(), request.date().map(|d| d.to_string()));
        let behavior = self.rules.get(&key).copied().unwrap_or(Behavior::Save);
        match behavior {
            Behavior::Save => save(destination),
            Behavior::FailOnce if previous_calls > 0 => save(destination),
            Behavior::Unavailable => DownloadOutcome::Unavailable,
            Behavior::Fail | Behavior::FailOnce => DownloadOutcome::Failed(FetcherError::HttpStatus {
                status: 503,
                kind: FailureKind::ServerError(503),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                DownloadOutcome::Unavailable
            }
        }
    }
}

fn save(destination: &Path) -> DownloadOutcome {
    match std::fs::write(destination, b"SYMBOL,SERIES,CLOSE\nINFY,EQ,1600.15\n") {
        Ok(()) => DownloadOutcome::Saved(destination.to_path_buf()),
        Err(e) => DownloadOutcome::Failed(FetcherError::Io(e.to_string())),
    }
}

fn config(dir: &TempDir) -> DownloaderConfig {
    DownloaderConfig::new()
        .with_data_dir(dir.path().join("NSE-Data"))
        .with_checkpoint_file(dir.path().join("last-success.json"))
}

fn keys(dates: &[&str]) -> Vec<DateKey> {
    dates.iter().map(|d| DateKey::parse(d).unwrap()).collect()
}

fn relative(dir: &TempDir, paths: &[PathBuf]) -> BTreeSet<PathBuf> {
    paths
        .iter()
        .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
        .collect()
}

#[tokio::test]
async fn test_in_flight_fetches_bounded_by_workers_times_three() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_millis(20)));
    let orchestrator =
        BatchOrchestrator::new(config(&dir).with_concurrency(2), fetcher.clone());

    let dates = keys(&[
        "01032024", "04032024", "05032024", "06032024", "07032024", "11032024", "12032024",
        "13032024",
    ]);
    let result = orchestrator.run(&dates).await.unwrap();

    assert_eq!(result.fully_successful.len(), 8);
    assert_eq!(fetcher.date_scoped_calls(), 24);
    assert!(
        fetcher.max_in_flight() <= 6,
        "observed {} concurrent fetches",
        fetcher.max_in_flight()
    );
    assert!(fetcher.max_in_flight() >= 3, "each date fetches its files together");
}

#[tokio::test]
async fn test_holiday_and_valid_date() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new().date("25032024", Behavior::Unavailable));
    let orchestrator = BatchOrchestrator::new(config(&dir), fetcher);

    let result = orchestrator.run(&keys(&["25032024", "22032024"])).await.unwrap();

    let expected: BTreeSet<PathBuf> = [
        "NSE-Data/stocks/22032024.csv",
        "NSE-Data/indices/22032024.csv",
        "NSE-Data/ma/22032024.csv",
        "NSE-Data/broad/nifty50list.csv",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    assert_eq!(relative(&dir, &result.saved_paths), expected);
    assert_eq!(result.fully_successful, keys(&["22032024"]));
    assert!(result.reports[1].is_unavailable());
    assert_eq!(result.checkpoint_written, Some(DateKey::parse("22032024").unwrap()));
    assert_eq!(orchestrator.get_checkpoint().unwrap(), Some("22032024".to_string()));

    assert!(!dir.path().join("NSE-Data/stocks/25032024.csv").exists());
}

#[tokio::test]
async fn test_input_order_does_not_matter() {
    let forward = TempDir::new().unwrap();
    let backward = TempDir::new().unwrap();

    let a = BatchOrchestrator::new(config(&forward), Arc::new(ScriptedFetcher::new()));
    let b = BatchOrchestrator::new(config(&backward), Arc::new(ScriptedFetcher::new()));

    let saved_a = a
        .run_batch(&["15032024".to_string(), "14032024".to_string()])
        .await
        .unwrap();
    let saved_b = b
        .run_batch(&["14032024".to_string(), "15032024".to_string()])
        .await
        .unwrap();

    assert_eq!(relative(&forward, &saved_a), relative(&backward, &saved_b));
    assert_eq!(a.get_checkpoint().unwrap(), Some("15032024".to_string()));
    assert_eq!(b.get_checkpoint().unwrap(), Some("15032024".to_string()));
}

#[tokio::test]
async fn test_checkpoint_uses_calendar_order() {
    let dir = TempDir::new().unwrap();
    let orchestrator = BatchOrchestrator::new(config(&dir), Arc::new(ScriptedFetcher::new()));

    // Byte order would pick 31122023
    orchestrator
        .run(&keys(&["31122023", "02012024"]))
        .await
        .unwrap();

    assert_eq!(orchestrator.get_checkpoint().unwrap(), Some("02012024".to_string()));
}

#[tokio::test]
async fn test_partial_date_keeps_files_but_not_checkpoint() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new().file(Category::MonthlyAggregate, "15032024", Behavior::Fail),
    );
    let orchestrator = BatchOrchestrator::new(config(&dir), fetcher);

    let result = orchestrator
        .run(&keys(&["14032024", "15032024"]))
        .await
        .unwrap();

    assert_eq!(result.fully_successful, keys(&["14032024"]));
    assert_eq!(orchestrator.get_checkpoint().unwrap(), Some("14032024".to_string()));
    // No rollback of the files that did arrive
    assert!(dir.path().join("NSE-Data/stocks/15032024.csv").exists());
    assert!(dir.path().join("NSE-Data/indices/15032024.csv").exists());
    assert!(!dir.path().join("NSE-Data/ma/15032024.csv").exists());

    let incomplete: Vec<_> = result.incomplete().collect();
    assert_eq!(incomplete.len(), 1);
    let missing: Vec<_> = incomplete[0].missing().map(|(c, _)| *c).collect();
    assert_eq!(missing, vec![Category::MonthlyAggregate]);
}

#[tokio::test]
async fn test_reference_failure_does_not_block_checkpoint() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new().reference(Behavior::Fail));
    let orchestrator = BatchOrchestrator::new(config(&dir), fetcher.clone());

    let result = orchestrator.run(&keys(&["14032024"])).await.unwrap();

    assert!(matches!(result.reference, Some(DownloadOutcome::Failed(_))));
    assert_eq!(result.saved_paths.len(), 3);
    assert_eq!(orchestrator.get_checkpoint().unwrap(), Some("14032024".to_string()));
    assert_eq!(
        fetcher
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.category() == Category::Reference)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_all_dates_failing_leaves_checkpoint_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path().join("last-success.json"));
    store.save(&DateKey::parse("01012024").unwrap()).unwrap();

    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .date("14032024", Behavior::Fail)
            .date("15032024", Behavior::Unavailable)
            .reference(Behavior::Unavailable),
    );
    let orchestrator = BatchOrchestrator::new(config(&dir), fetcher);

    let result = orchestrator
        .run(&keys(&["14032024", "15032024"]))
        .await
        .unwrap();

    assert!(result.saved_paths.is_empty());
    assert!(result.fully_successful.is_empty());
    assert!(result.checkpoint_written.is_none());
    assert_eq!(store.load().unwrap(), Some(DateKey::parse("01012024").unwrap()));
}

#[tokio::test]
async fn test_hung_fetch_times_out_as_failed() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new().file(Category::IndexClose, "15032024", Behavior::Hang),
    );
    let orchestrator = BatchOrchestrator::new(
        config(&dir).with_fetch_timeout(Duration::from_millis(100)),
        fetcher.clone(),
    );

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator.run(&keys(&["14032024", "15032024"])),
    )
    .await
    .expect("batch should not hang")
    .unwrap();

    assert_eq!(result.fully_successful, keys(&["14032024"]));
    let report = &result.reports[1];
    assert!(matches!(
        report.outcomes[1],
        (Category::IndexClose, DownloadOutcome::Failed(FetcherError::Timeout(_)))
    ));
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_retry_recovers_transient_failure() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .file(Category::PerSymbol, "14032024", Behavior::FailOnce)
            .date("15032024", Behavior::Unavailable),
    );
    let orchestrator =
        BatchOrchestrator::new(config(&dir).with_max_retries(1), fetcher.clone());

    let result = orchestrator
        .run(&keys(&["14032024", "15032024"]))
        .await
        .unwrap();

    assert_eq!(result.fully_successful, keys(&["14032024"]));
    assert_eq!(fetcher.calls_for(Category::PerSymbol, "14032024"), 2);
    // Missing files are never retried
    assert_eq!(fetcher.calls_for(Category::PerSymbol, "15032024"), 1);
}

#[tokio::test]
async fn test_without_retries_failure_is_final() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new().file(Category::PerSymbol, "14032024", Behavior::FailOnce),
    );
    let orchestrator = BatchOrchestrator::new(config(&dir), fetcher.clone());

    let result = orchestrator.run(&keys(&["14032024"])).await.unwrap();

    assert!(result.fully_successful.is_empty());
    assert_eq!(fetcher.calls_for(Category::PerSymbol, "14032024"), 1);
}

#[tokio::test]
async fn test_batch_maximum_policy_can_move_checkpoint_back() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path().join("last-success.json"));
    store.save(&DateKey::parse("20032024").unwrap()).unwrap();

    let orchestrator = BatchOrchestrator::new(config(&dir), Arc::new(ScriptedFetcher::new()));
    orchestrator.run(&keys(&["14032024"])).await.unwrap();

    assert_eq!(store.load().unwrap(), Some(DateKey::parse("14032024").unwrap()));
}

#[tokio::test]
async fn test_monotonic_policy_never_moves_checkpoint_back() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path().join("last-success.json"));
    store.save(&DateKey::parse("20032024").unwrap()).unwrap();

    let orchestrator = BatchOrchestrator::new(
        config(&dir).with_checkpoint_policy(CheckpointPolicy::Monotonic),
        Arc::new(ScriptedFetcher::new()),
    );

    let result = orchestrator.run(&keys(&["14032024"])).await.unwrap();
    assert!(result.checkpoint_written.is_none());
    assert_eq!(store.load().unwrap(), Some(DateKey::parse("20032024").unwrap()));

    let result = orchestrator.run(&keys(&["21032024"])).await.unwrap();
    assert_eq!(result.checkpoint_written, Some(DateKey::parse("21032024").unwrap()));
    assert_eq!(store.load().unwrap(), Some(DateKey::parse("21032024").unwrap()));
}

#[tokio::test]
async fn test_shutdown_before_run_skips_everything() {
    let dir = TempDir::new().unwrap();
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let fetcher = Arc::new(ScriptedFetcher::new());
    let orchestrator =
        BatchOrchestrator::new(config(&dir), fetcher.clone()).with_shutdown(shutdown);

    let result = orchestrator
        .run(&keys(&["14032024", "15032024"]))
        .await
        .unwrap();

    assert!(result.reports.is_empty());
    assert_eq!(result.skipped, keys(&["14032024", "15032024"]));
    assert!(result.reference.is_none());
    assert!(fetcher.calls.lock().unwrap().is_empty());
    assert_eq!(orchestrator.get_checkpoint().unwrap(), None);
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_date_finish() {
    let dir = TempDir::new().unwrap();
    let shutdown = ShutdownCoordinator::shared();
    let fetcher = Arc::new(ScriptedFetcher::new().shutdown_on_first_call(shutdown.clone()));
    let orchestrator = BatchOrchestrator::new(config(&dir).with_concurrency(1), fetcher)
        .with_shutdown(shutdown);

    let result = orchestrator
        .run(&keys(&["14032024", "15032024", "18032024"]))
        .await
        .unwrap();

    assert_eq!(result.fully_successful, keys(&["14032024"]));
    assert_eq!(result.skipped, keys(&["15032024", "18032024"]));
    assert_eq!(orchestrator.get_checkpoint().unwrap(), Some("14032024".to_string()));
}

#[tokio::test]
async fn test_layout_failure_aborts_batch() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("NSE-Data"), b"occupied").unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    let orchestrator = BatchOrchestrator::new(config(&dir), fetcher.clone());

    let err = orchestrator.run(&keys(&["14032024"])).await.unwrap_err();
    assert!(matches!(err, nse_data_downloader::DownloadError::Layout(_)));
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

/// Answer every request with a 200 whose body stalls after a few bytes
async fn stalling_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\nSYMBOL,CLOSE\n")
                    .await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_body_stalled_past_timeout_leaves_no_files() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir)
        .with_base_url(stalling_server().await)
        .with_fetch_timeout(Duration::from_millis(300));
    let orchestrator = BatchOrchestrator::from_config(config).unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator.run(&keys(&["15032024"])),
    )
    .await
    .expect("batch should not hang")
    .unwrap();

    assert!(result.saved_paths.is_empty());
    assert!(result.fully_successful.is_empty());
    assert!(result.reports[0]
        .outcomes
        .iter()
        .all(|(_, outcome)| matches!(outcome, DownloadOutcome::Failed(_))));
    for folder in ["stocks", "indices", "ma", "broad"] {
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("NSE-Data").join(folder))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(entries.is_empty(), "{folder} left behind: {entries:?}");
    }
    assert_eq!(orchestrator.get_checkpoint().unwrap(), None);
}
