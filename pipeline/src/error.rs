use thiserror::Error;

use pupil_engine::EngineError;
use pupil_store::StoreError;

/// Errors surfaced by pipeline operations.
///
/// Invalid records, extraction failures on single images, detection
/// ambiguity and comparison failures are all resolved inside the pipeline
/// (by deletion or by treating the probe as a non-match) and never appear
/// here. What remains is the missing-model precondition and genuine
/// storage failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
