//! Error types for Shiko Executor
//!
//! Executors are not retried; these errors end up in the reactor log.

use shiko_core::PackError;

/// Main executor error type
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Timeline API call failed
    #[error("timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// Counter store call failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Reply text could not be assembled
    #[error("failed to prepare reply: {0}")]
    Pack(#[from] PackError),

    /// Administration command family not handled
    #[error("unsupported command type: {0}")]
    UnsupportedCommand(String),

    /// Calendar arithmetic went out of range
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// Timeline API errors
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// Request could not be sent or the response not read
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        /// Request path
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
}

impl TimelineError {
    /// Check if a later attempt could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Counter store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The blocking worker did not finish
    #[error("store worker failed: {0}")]
    Worker(String),
}
