use chrono::Utc;
use tracing::{info, warn};

use pupil_engine::{EngineError, InferenceEngine};
use pupil_store::ImageRecord;
use pupil_vectors as vectors;

use crate::error::PipelineError;
use crate::validate::{self, Validity};
use crate::Pipeline;

/// What one extraction batch did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractReport {
    pub extracted: usize,
    pub orphans_deleted: usize,
    pub sessions_deleted: usize,
}

impl Pipeline {
    /// Extracts an embedding for every image that does not have one yet.
    ///
    /// A missing model file fails the whole batch before any image is
    /// touched. Every other problem is resolved per image: orphans are
    /// deleted on their own, images with missing bytes or failed
    /// extraction take their whole session down, and the batch continues
    /// with the next image. Running this twice with no new data is a
    /// no-op.
    pub fn extract_features(&self) -> Result<ExtractReport, PipelineError> {
        let _batch = self.batch.lock();

        let pending = self.store.images_missing_feature()?;
        info!("{} images awaiting feature extraction", pending.len());

        let mut report = ExtractReport::default();
        if pending.is_empty() {
            return Ok(report);
        }

        let engine = self.load_engine()?;
        for image in pending {
            match validate::check_image(&self.store, self.images.as_ref(), &image)? {
                Validity::Orphaned => {
                    validate::delete_orphan(&self.store, &image)?;
                    report.orphans_deleted += 1;
                    continue;
                }
                Validity::MissingBlob => {
                    validate::cascade_delete(
                        &self.store,
                        image.session_id,
                        image.id,
                        &format!("the file {} does not exist", image.blob_key),
                    )?;
                    report.sessions_deleted += 1;
                    continue;
                }
                Validity::Valid => {}
            }

            match self.extract_one(engine.as_ref(), &image) {
                Ok(encoded) => {
                    let feature = self.store.insert_feature(image.id, &encoded, Utc::now())?;
                    let mut image = image;
                    image.feature_id = Some(feature.id);
                    self.store.update_image(&image)?;
                    info!("feature {} stored for image {}", feature.id, image.id);
                    report.extracted += 1;
                }
                Err(err) => {
                    warn!("feature extraction failed for image {}: {err}", image.id);
                    validate::cascade_delete(
                        &self.store,
                        image.session_id,
                        image.id,
                        "the feature extraction failed",
                    )?;
                    report.sessions_deleted += 1;
                }
            }
        }
        Ok(report)
    }

    /// Runs the engine on one image and returns the encoded vector.
    fn extract_one(
        &self,
        engine: &dyn InferenceEngine,
        image: &ImageRecord,
    ) -> Result<String, PipelineError> {
        let bytes = self.images.read(&image.blob_key)?;
        let vector = engine.infer(&bytes)?;
        let expected = engine.output_size();
        if vector.len() != expected {
            return Err(EngineError::Dimension {
                expected,
                got: vector.len(),
            }
            .into());
        }
        Ok(vectors::to_json(&vector))
    }
}
