//! KV key layout for enrollment records.
//!
//! Numeric ids are zero-padded to 20 digits so prefix scans return records
//! in id order:
//!
//! ```text
//! img:{id:020}    → ImageRecord
//! feat:{id:020}   → FeatureRecord
//! sess:{id:020}   → SessionRecord
//! ident:{id:020}  → IdentityRecord
//! seq:{kind}      → last allocated id for that record kind
//! ```

use crate::types::{FeatureId, IdentityId, ImageId, SessionId};

pub const IMAGE_PREFIX: &str = "img:";
pub const FEATURE_PREFIX: &str = "feat:";
pub const SESSION_PREFIX: &str = "sess:";
pub const IDENTITY_PREFIX: &str = "ident:";

pub fn image_key(id: ImageId) -> String {
    format!("{IMAGE_PREFIX}{id:020}")
}

pub fn feature_key(id: FeatureId) -> String {
    format!("{FEATURE_PREFIX}{id:020}")
}

pub fn session_key(id: SessionId) -> String {
    format!("{SESSION_PREFIX}{id:020}")
}

pub fn identity_key(id: IdentityId) -> String {
    format!("{IDENTITY_PREFIX}{id:020}")
}

pub fn seq_key(kind: &str) -> String {
    format!("seq:{kind}")
}
