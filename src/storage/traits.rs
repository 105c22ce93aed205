//! Object store trait and error types
//!
//! This module defines the interface the uploader writes resources through and
//! the errors a backend can report.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while storing an object
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error writing {key}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    #[error("HTTP error storing {key}: {source}")]
    Http {
        key: String,
        source: reqwest::Error,
    },

    #[error("S3 error storing {key}: {message}")]
    S3 { key: String, message: String },

    #[error("Store rejected {key} with HTTP {status}")]
    Rejected { key: String, status: u16 },

    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for object store backends
///
/// A put either succeeds or fails as a whole. Writing an existing key replaces
/// the stored object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `key` with the given content type
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> StoreResult<()>;

    /// Short human-readable description used in logs
    fn describe(&self) -> String;
}

/// Rejects keys that would escape a flat namespace
pub(crate) fn check_key(key: &str) -> StoreResult<()> {
    if key.is_empty() || key == "." || key == ".." || key.contains('/') || key.contains('\\') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
