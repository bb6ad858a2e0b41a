//! Shared fixtures for pipeline tests.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use pupil_engine::{
    EngineConfig, EngineError, EngineProvider, FaceDetector, FaceRegion, InferenceEngine, Rect,
};
use pupil_store::{BlobStore, ImageRecord, MemoryBlobStore, RecordStore, SessionRecord};

use crate::{Pipeline, PipelineConfig};

/// Engine that looks embeddings up by exact image bytes.
/// Unknown bytes fail inference, which the pipeline treats as an
/// extraction failure.
pub(crate) struct TableEngine {
    pub dim: usize,
    pub table: HashMap<Vec<u8>, Vec<f32>>,
}

impl InferenceEngine for TableEngine {
    fn infer(&self, image: &[u8]) -> Result<Vec<f32>, EngineError> {
        self.table
            .get(image)
            .cloned()
            .ok_or_else(|| EngineError::Inference("no embedding for image".into()))
    }

    fn output_size(&self) -> usize {
        self.dim
    }
}

pub(crate) struct FixedProvider(pub Arc<TableEngine>);

impl EngineProvider for FixedProvider {
    fn load(&self, _cfg: &EngineConfig) -> Result<Arc<dyn InferenceEngine>, EngineError> {
        Ok(self.0.clone())
    }
}

/// Detector returning `faces` copies of the whole input as crops.
pub(crate) struct FanDetector {
    pub faces: usize,
}

impl FaceDetector for FanDetector {
    fn detect_and_crop(&self, image: &[u8]) -> Result<Vec<FaceRegion>, EngineError> {
        Ok((0..self.faces)
            .map(|_| FaceRegion {
                crop: image.to_vec(),
                bounds: Rect {
                    x: 0,
                    y: 0,
                    width: 64,
                    height: 64,
                },
            })
            .collect())
    }
}

/// A pipeline wired onto in-memory stores, with a real (temporary) model
/// file so the engine preflight passes.
pub(crate) struct Fixture {
    pub store: Arc<RecordStore>,
    pub images: Arc<MemoryBlobStore>,
    pub avatars: Arc<MemoryBlobStore>,
    pub pipeline: Pipeline,
    pub model_path: PathBuf,
    _model_dir: tempfile::TempDir,
}

pub(crate) fn fixture(dim: usize, table: HashMap<Vec<u8>, Vec<f32>>, faces: usize) -> Fixture {
    let model_dir = tempfile::tempdir().unwrap();
    let model_path = model_dir.path().join("vgg_faces.pb");
    fs::write(&model_path, b"weights").unwrap();

    let store = Arc::new(RecordStore::in_memory());
    let images = Arc::new(MemoryBlobStore::new());
    let avatars = Arc::new(MemoryBlobStore::new());
    let engine = Arc::new(TableEngine { dim, table });

    let cfg = PipelineConfig {
        engine: EngineConfig {
            model_path: model_path.clone(),
            output_size: dim,
            ..EngineConfig::default()
        },
        match_threshold: 0.8,
        workers: 2,
    };

    let pipeline = Pipeline::new(
        store.clone(),
        images.clone(),
        avatars.clone(),
        Arc::new(FixedProvider(engine)),
        Arc::new(FanDetector { faces }),
        cfg,
    )
    .with_seed(7);

    Fixture {
        store,
        images,
        avatars,
        pipeline,
        model_path,
        _model_dir: model_dir,
    }
}

/// Creates a session whose images carry the given blob bytes.
pub(crate) fn seed_session(f: &Fixture, blobs: &[(&str, &[u8])]) -> (SessionRecord, Vec<ImageRecord>) {
    let session = f.store.insert_session().unwrap();
    let mut images = Vec::with_capacity(blobs.len());
    for (key, bytes) in blobs {
        f.images.write(key, bytes).unwrap();
        images.push(f.store.insert_image(session.id, key).unwrap());
    }
    (session, images)
}
