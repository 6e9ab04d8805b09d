//! HTTP archive fetcher
//!
//! Streams archive files straight to disk. Bodies are written chunk by chunk
//! to a hidden temporary file next to the destination and renamed into place
//! only once the stream has completed, so readers never see a partial CSV.

use super::failure::classify;
use super::{DownloadOutcome, FetcherError, FetcherResult, ResourceFetcher, ResourceRequest};
use crate::metrics::FetchMetrics;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// HTTP connect timeout (seconds)
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("nse-data-downloader/", env!("CARGO_PKG_VERSION"));

/// Fetcher backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    /// Create a fetcher for `base_url` with the given overall request timeout
    ///
    /// The timeout covers the whole exchange including the body stream.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> FetcherResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetcherError::ClientSetup(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Archive base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn download(&self, url: &str, destination: &Path) -> FetcherResult<Option<u64>> {
        let response = self.client.get(url).send().await.map_err(|e| FetcherError::Network {
            kind: classify(None, Some(&e)),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
                kind: classify(Some(status), None),
            });
        }

        stream_to_file(response, destination).await.map(Some)
    }
}

/// Write the response body to `destination` via a temporary sibling file
///
/// The temporary file is removed when dropped, so every early return leaves
/// the destination untouched.
async fn stream_to_file(mut response: Response, destination: &Path) -> FetcherResult<u64> {
    let dir = destination.parent().ok_or_else(|| {
        FetcherError::Io(format!("destination has no parent: {}", destination.display()))
    })?;

    let temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| FetcherError::Io(format!("Failed to create temp file: {e}")))?;
    let (std_file, temp_path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(std_file);

    let mut written: u64 = 0;
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                file.write_all(&chunk)
                    .await
                    .map_err(|e| FetcherError::Io(format!("Failed to write chunk: {e}")))?;
                written += chunk.len() as u64;
            }
            Ok(None) => break,
            Err(e) => {
                return Err(FetcherError::Network {
                    kind: classify(None, Some(&e)),
                    message: e.to_string(),
                })
            }
        }
    }

    file.flush()
        .await
        .map_err(|e| FetcherError::Io(format!("Failed to flush temp file: {e}")))?;
    file.sync_all()
        .await
        .map_err(|e| FetcherError::Io(format!("Failed to sync temp file: {e}")))?;
    drop(file);

    temp_path
        .persist(destination)
        .map_err(|e| FetcherError::Io(format!("Failed to persist temp file: {e}")))?;

    Ok(written)
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, request: &ResourceRequest, destination: &Path) -> DownloadOutcome {
        let url = request.url(&self.base_url);
        let metrics = FetchMetrics::start(request.category());

        debug!(resource = %request, url = %url, "Fetching archive file");

        let outcome = match self.download(&url, destination).await {
            Ok(Some(bytes)) => {
                debug!(
                    resource = %request,
                    path = %destination.display(),
                    bytes,
                    "Archive file saved"
                );
                DownloadOutcome::Saved(destination.to_path_buf())
            }
            Ok(None) => {
                warn!(resource = %request, url = %url, "File not found in archive");
                DownloadOutcome::Unavailable
            }
            Err(e) => {
                warn!(resource = %request, url = %url, error = %e, "Error downloading archive file");
                DownloadOutcome::Failed(e)
            }
        };

        metrics.record(&outcome);
        outcome
    }
}
