use thiserror::Error;

/// Errors returned by vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    #[error("empty vector set")]
    Empty,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("vector codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
