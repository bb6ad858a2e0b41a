use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by engine and detector operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The network definition file is absent. Fatal for the whole batch;
    /// recoverable across runs once the file is copied into place.
    #[error("model file {} does not exist, please copy it manually (download: {link})", path.display())]
    ModelMissing { path: PathBuf, link: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("face detection failed: {0}")]
    Detection(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },
}
