use crate::error::EngineError;

/// Axis-aligned bounding rectangle of a detected face, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// One detected face: the cropped region bytes plus where it was found.
#[derive(Debug, Clone)]
pub struct FaceRegion {
    pub crop: Vec<u8>,
    pub bounds: Rect,
}

/// Finds faces in an image and crops them out.
///
/// Recognition only proceeds when exactly one face is returned; zero or
/// multiple faces make the probe unusable, not an error.
pub trait FaceDetector: Send + Sync {
    fn detect_and_crop(&self, image: &[u8]) -> Result<Vec<FaceRegion>, EngineError>;
}
