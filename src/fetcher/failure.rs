//! Failure classification and retry messages for archive fetches.

use reqwest::{Error as ReqwestError, StatusCode};
use std::fmt;
use std::time::Duration;

/// Classification of a failed fetch for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Request or body read exceeded its time budget
    Timeout,
    /// Connection refused, DNS failure, or other offline scenarios
    Connection,
    /// HTTP 429 from the archive
    RateLimited,
    /// HTTP 5xx server error
    ServerError(u16),
    /// HTTP 4xx other than 404 and 429
    ClientError(u16),
    /// Writing the body to disk failed
    Io,
    /// Generic fallback when no better classification fits
    Network,
}

impl FailureKind {
    /// User-friendly description used in log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "network timeout",
            Self::Connection => "connection failed",
            Self::RateLimited => "rate limited by archive",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::ClientError(code) => match code {
                401 | 403 => "access denied by archive",
                _ => "client error",
            },
            Self::Io => "local write failed",
            Self::Network => "network error",
        }
    }

    /// Suggested remediation shown with the batch summary.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Timeout => "Check your network connection or raise --fetch-timeout-secs",
            Self::Connection => "Verify internet connectivity and DNS resolution",
            Self::RateLimited => "Lower --concurrency and try again later",
            Self::ServerError(_) => "The archive may be experiencing issues, try again later",
            Self::ClientError(_) => "The archive refused the request; check --base-url",
            Self::Io => "Check free disk space and permissions on --data-dir",
            Self::Network => "Check network connectivity and try again",
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::ClientError(_) | FailureKind::Io)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Extract a [`FailureKind`] from an HTTP status or reqwest error.
pub fn classify(status: Option<StatusCode>, err: Option<&ReqwestError>) -> FailureKind {
    if let Some(status) = status {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return FailureKind::RateLimited;
        }
        if status.is_server_error() {
            return FailureKind::ServerError(status.as_u16());
        }
        if status.is_client_error() {
            return FailureKind::ClientError(status.as_u16());
        }
    }

    if let Some(err) = err {
        if err.is_timeout() {
            return FailureKind::Timeout;
        }
        if err.is_connect() {
            return FailureKind::Connection;
        }
    }

    FailureKind::Network
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of failure that triggered the retry
    pub kind: FailureKind,
    /// Backoff duration until next attempt
    pub backoff: Duration,
    /// Resource being fetched, e.g. "stocks/15032024"
    pub resource: String,
}

impl RetryContext {
    /// Format standardized retry message with attempt counters.
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying {} (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.resource,
            self.attempt,
            self.max_attempts,
            self.kind.description(),
            self.backoff.as_secs_f64()
        )
    }

    /// Format final failure summary with a remediation hint.
    pub fn format_failure(&self) -> String {
        format!(
            "[FAILED] {} failed after {} attempts: {}\n  Suggestion: {}",
            self.resource,
            self.max_attempts,
            self.kind.description(),
            self.kind.suggestion()
        )
    }
}
