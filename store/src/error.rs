use thiserror::Error;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("blob {0:?} not found")]
    BlobMissing(String),

    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),
}
