//! Error types for the record store and the blob sidecar.

use marker_types::{DataUrlError, DraftError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("marker not found: {0}")]
    NotFound(String),
    #[error("marker id already exists: {0}")]
    DuplicateId(String),
    #[error("invalid marker id: {0:?}")]
    InvalidId(String),
    #[error(transparent)]
    InvalidDraft(#[from] DraftError),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::StorageUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::StorageUnavailable(format!("malformed marker data: {}", e))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::StorageUnavailable(format!("database error: {}", e))
    }
}

/// Image side-car failures. These never fail a create; callers log them.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("could not decode image: {0}")]
    Decode(#[from] DataUrlError),
    #[error("could not write image: {0}")]
    Write(#[from] std::io::Error),
}
