use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ImageId = u64;
pub type FeatureId = u64;
pub type SessionId = u64;
pub type IdentityId = u64;

/// A captured student image awaiting (or holding) an extracted feature.
///
/// `session_id` names the enrollment session the image was captured for.
/// An image whose session record no longer exists is orphaned and gets
/// deleted lazily on discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub session_id: SessionId,
    /// Key of the raw image bytes in the image blob store.
    pub blob_key: String,
    /// Set once feature extraction has run for this image.
    pub feature_id: Option<FeatureId>,
}

/// An extracted embedding, owned by exactly one image.
/// Created once, never mutated afterwards except by deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub id: FeatureId,
    pub image_id: ImageId,
    /// JSON-encoded f32 array (see `pupil_vectors::to_json`).
    pub vector: String,
    pub created_at: DateTime<Utc>,
}

/// One enrollment attempt, grouping the images captured for it.
///
/// `representative` is set exactly once, after every member image has a
/// feature; `identity_id` links to the identity created at that moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    /// JSON-encoded mean of the member feature vectors.
    pub representative: Option<String>,
    pub identity_id: Option<IdentityId>,
}

/// A distinct recognized person, created from one enrollment session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: IdentityId,
    /// Generated collision-free identifier, also used as the avatar key stem.
    pub unique_id: String,
    /// Key of the avatar bytes in the avatar blob store, when the copy
    /// succeeded.
    pub avatar_key: Option<String>,
    pub created_at: DateTime<Utc>,
}
