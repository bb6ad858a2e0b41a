//! Boundaries to the convolutional inference engine and the face detector.
//!
//! The engine itself is opaque: image bytes in, fixed-length `f32` embedding
//! out. This crate owns the configuration for loading it, the preflight that
//! verifies the model file is present on device (and leaves a download note
//! behind when it is not), and the trait seams the pipeline depends on.

mod config;
mod detect;
mod error;
mod model;

pub use config::{EngineConfig, MODEL_DOWNLOAD_LINK};
pub use detect::{FaceDetector, FaceRegion, Rect};
pub use error::EngineError;
pub use model::{ensure_model, EngineProvider, InferenceEngine};
