//! Embedding-vector math shared across the enrollment pipeline.
//!
//! Vectors are dense `f32` embeddings produced by the inference engine.
//! Persisted vectors use a JSON array encoding (see [`to_json`] /
//! [`from_json`]) so stored features stay human-inspectable.

mod codec;
mod error;
mod ops;

pub use codec::{from_json, to_json};
pub use error::VectorError;
pub use ops::{cosine_sim, mean};
