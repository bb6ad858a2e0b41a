use crate::VectorError;

/// Encodes a vector as a JSON array of numbers.
/// The encoding is lossless: [`from_json`] restores the exact f32 values.
pub fn to_json(v: &[f32]) -> String {
    serde_json::to_string(v).expect("f32 slice serializes infallibly")
}

/// Decodes a vector from its JSON array encoding.
pub fn from_json(s: &str) -> Result<Vec<f32>, VectorError> {
    Ok(serde_json::from_str(s)?)
}
