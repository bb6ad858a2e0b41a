use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{EngineConfig, MODEL_DOWNLOAD_LINK};
use crate::error::EngineError;

/// Computes face embeddings from image bytes.
///
/// Deterministic for fixed model weights and image bytes. Implementations
/// are not required to be safe for concurrent inference; the pipeline
/// serializes batch operations around a single coarse lock.
pub trait InferenceEngine: Send + Sync {
    /// Runs the network on one image and returns the embedding vector.
    fn infer(&self, image: &[u8]) -> Result<Vec<f32>, EngineError>;

    /// Length of the vectors produced by [`InferenceEngine::infer`].
    fn output_size(&self) -> usize;
}

/// Constructs a concrete [`InferenceEngine`] from its configuration.
///
/// [`ensure_model`] runs first, so `load` may assume the model file exists.
pub trait EngineProvider: Send + Sync {
    fn load(&self, cfg: &EngineConfig) -> Result<Arc<dyn InferenceEngine>, EngineError>;
}

/// Verifies that the network definition file is present.
///
/// When the file is absent, a `download_link.txt` note is written next to
/// the expected path so whoever services the device knows where to get the
/// model and where to put it. Failure to write the note does not mask the
/// missing-model error.
pub fn ensure_model(cfg: &EngineConfig) -> Result<(), EngineError> {
    if cfg.model_path.exists() {
        return Ok(());
    }

    match write_download_note(&cfg.model_path) {
        Ok(note) => {
            info!("model download note written to {}", note.display());
        }
        Err(err) => {
            warn!("could not write model download note: {err}");
        }
    }

    let err = EngineError::ModelMissing {
        path: cfg.model_path.clone(),
        link: MODEL_DOWNLOAD_LINK.to_string(),
    };
    error!("{err}");
    Err(err)
}

fn write_download_note(model_path: &std::path::Path) -> std::io::Result<PathBuf> {
    let dir = model_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let note = dir.join("download_link.txt");
    let body = format!("{MODEL_DOWNLOAD_LINK}\nCopy to: {}\n", model_path.display());
    fs::write(&note, body)?;
    Ok(note)
}
