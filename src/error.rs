//! Error types for the graphgate query dispatch layer.

use thiserror::Error;

/// Cache backend errors.
///
/// These never reach callers of the façade: a failing backend degrades to
/// a cache miss on read and a logged event on write.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Cache backend I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache entry could not be encoded: {0}")]
    Encode(String),

    #[error("Cache entry could not be decoded: {0}")]
    Decode(String),
}

/// Errors surfaced by query dispatch and result shaping.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Unexpected result shape: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Dispatch queue dropped the task before it completed")]
    QueueClosed,
}

impl QueryError {
    /// Whether the dispatch queue should retry after this error.
    ///
    /// Only transport-level conditions are transient; codec and shape errors
    /// will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::Status { .. } | QueryError::Transport(_))
    }
}

impl From<StorageError> for QueryError {
    fn from(err: StorageError) -> Self {
        QueryError::Storage(err.to_string())
    }
}

impl From<config::ConfigError> for QueryError {
    fn from(err: config::ConfigError) -> Self {
        QueryError::Config(err.to_string())
    }
}
