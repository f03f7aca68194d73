//! Error types for the cache and feed core
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Remote Error Enum ==
/// Failure reported by a remote collaborator (chapter API, document store).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport-level failure (connection refused, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Remote answered with a non-success status code
    #[error("Remote returned status {0}")]
    Status(u16),

    /// Payload could not be decoded into the expected shape
    #[error("Malformed payload: {0}")]
    Decode(String),

    /// Remote has no such resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anything else a collaborator wants to surface
    #[error("{0}")]
    Other(String),
}

// == Cache Error Enum ==
/// Unified error type for the cache and feed core.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Durable store could not be opened
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Durable store failed while reading an entry
    #[error("Read failed for {partition}/{key}: {reason}")]
    Read {
        partition: &'static str,
        key: String,
        reason: String,
    },

    /// Durable store failed while writing an entry
    #[error("Write failed for {partition}/{key}: {reason}")]
    Write {
        partition: &'static str,
        key: String,
        reason: String,
    },

    /// Chapter is neither cached nor fetchable
    #[error("Chapter {book} {chapter} ({version}) is not available offline")]
    ChapterUnavailable {
        book: String,
        chapter: u32,
        version: String,
        #[source]
        source: RemoteError,
    },

    /// Remote feed page fetch failed
    #[error("Failed to fetch feed page: {0}")]
    FetchPage(#[source] RemoteError),

    /// TTL must be strictly positive
    #[error("Invalid TTL: {0}ms")]
    InvalidTtl(u64),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Returns true when the same call may succeed if repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CacheError::Read { .. } | CacheError::Write { .. } | CacheError::FetchPage(_)
        )
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
