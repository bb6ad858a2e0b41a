//! Biometric enrollment and recognition pipeline.
//!
//! Captured student images flow through validity cleanup, feature
//! extraction and per-session aggregation into identities; a later
//! similarity sweep finds identities that are the same person and hands
//! them to a merge decision point.
//!
//! # Operations
//!
//! - [`Pipeline::extract_features`]: embed every image that has no feature
//!   yet, deleting invalid records (and, on unrecoverable sessions, the
//!   whole session chain) along the way.
//! - [`Pipeline::aggregate_sessions`]: mean the member features of each
//!   completed session into a representative vector and create its
//!   identity.
//! - [`Pipeline::recognize`]: match one probe against the enrolled
//!   population.
//! - [`Pipeline::find_and_merge`]: cross-identity similarity sweeps that
//!   trigger the [`MergePolicy`] decision point.
//!
//! # Concurrency
//!
//! Batch operations are mutually exclusive process-wide: one coarse lock
//! guards each whole operation, because the inference engine is not safe
//! for concurrent use and record cleanup must not race a concurrent read
//! of the same session. Individual probe comparisons run on a bounded
//! worker pool; the caller always collects every verdict for a probe
//! before acting on any of them.

mod aggregate;
mod config;
mod coordinate;
mod error;
mod extract;
mod merge;
mod recognize;
mod validate;

#[cfg(test)]
mod testutil;
#[cfg(test)]
mod tests;

pub use aggregate::AggregateReport;
pub use config::PipelineConfig;
pub use coordinate::MergeReport;
pub use error::PipelineError;
pub use extract::ExtractReport;
pub use merge::{LogOnlyMerge, MergeOutcome, MergePolicy};
pub use recognize::Probe;

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use pupil_engine::{ensure_model, EngineProvider, FaceDetector, InferenceEngine};
use pupil_store::{BlobStore, RecordStore};

/// The enrollment pipeline, wired onto its stores and engine boundaries.
pub struct Pipeline {
    pub(crate) store: Arc<RecordStore>,
    /// Captured image bytes, keyed by each image record's `blob_key`.
    pub(crate) images: Arc<dyn BlobStore>,
    /// Avatar bytes, keyed by `{identity.unique_id}.png`.
    pub(crate) avatars: Arc<dyn BlobStore>,
    pub(crate) provider: Arc<dyn EngineProvider>,
    pub(crate) detector: Arc<dyn FaceDetector>,
    pub(crate) cfg: PipelineConfig,
    /// Coarse guard making batch operations mutually exclusive.
    pub(crate) batch: Mutex<()>,
    /// Avatar selection randomness, seedable for deterministic tests.
    pub(crate) rng: Mutex<StdRng>,
}

impl Pipeline {
    pub fn new(
        store: Arc<RecordStore>,
        images: Arc<dyn BlobStore>,
        avatars: Arc<dyn BlobStore>,
        provider: Arc<dyn EngineProvider>,
        detector: Arc<dyn FaceDetector>,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            store,
            images,
            avatars,
            provider,
            detector,
            cfg,
            batch: Mutex::new(()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeds avatar selection. Tests use this for reproducible picks.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Verifies the model file and constructs the engine.
    /// A missing model fails the whole batch, never a single record.
    pub(crate) fn load_engine(&self) -> Result<Arc<dyn InferenceEngine>, PipelineError> {
        ensure_model(&self.cfg.engine)?;
        Ok(self.provider.load(&self.cfg.engine)?)
    }
}
