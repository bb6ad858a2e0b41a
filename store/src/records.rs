use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::keys;
use crate::kv::{KvBackend, MemoryKv, RedbKv};
use crate::types::{
    FeatureId, FeatureRecord, IdentityId, IdentityRecord, ImageId, ImageRecord, SessionId,
    SessionRecord,
};

/// Typed record layer over a [`KvBackend`].
///
/// Records serialize as JSON under the layout in [`crate::keys`]. Numeric
/// ids are allocated from persisted per-kind sequence keys, so they survive
/// restarts with the redb backend.
pub struct RecordStore {
    kv: Box<dyn KvBackend>,
}

impl RecordStore {
    pub fn new(kv: Box<dyn KvBackend>) -> Self {
        Self { kv }
    }

    /// In-memory store for tests and ephemeral use.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryKv::new()))
    }

    /// Opens or creates a persistent store at `path`.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Box::new(RedbKv::open(path)?)))
    }

    fn next_id(&self, kind: &str) -> Result<u64, StoreError> {
        let key = keys::seq_key(kind);
        let next = match self.kv.get(&key)? {
            Some(raw) => {
                let last: u64 = std::str::from_utf8(&raw)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| StoreError::Backend(format!("corrupt sequence key {key}")))?;
                last + 1
            }
            None => 1,
        };
        self.kv.put(&key, next.to_string().as_bytes())?;
        Ok(next)
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(value)?;
        self.kv.put(key, &raw)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, StoreError> {
        self.kv
            .scan_prefix(prefix)?
            .into_iter()
            .map(|(_, raw)| serde_json::from_slice(&raw).map_err(StoreError::from))
            .collect()
    }

    // ── images ───────────────────────────────────────────────────────────

    pub fn insert_image(
        &self,
        session_id: SessionId,
        blob_key: &str,
    ) -> Result<ImageRecord, StoreError> {
        let id = self.next_id("img")?;
        let rec = ImageRecord {
            id,
            session_id,
            blob_key: blob_key.to_string(),
            feature_id: None,
        };
        self.put_json(&keys::image_key(id), &rec)?;
        Ok(rec)
    }

    pub fn image(&self, id: ImageId) -> Result<Option<ImageRecord>, StoreError> {
        self.get_json(&keys::image_key(id))
    }

    pub fn update_image(&self, rec: &ImageRecord) -> Result<(), StoreError> {
        self.put_json(&keys::image_key(rec.id), rec)
    }

    pub fn delete_image(&self, id: ImageId) -> Result<(), StoreError> {
        self.kv.remove(&keys::image_key(id))
    }

    pub fn images(&self) -> Result<Vec<ImageRecord>, StoreError> {
        self.scan_json(keys::IMAGE_PREFIX)
    }

    /// Images whose features have not been extracted yet.
    pub fn images_missing_feature(&self) -> Result<Vec<ImageRecord>, StoreError> {
        Ok(self
            .images()?
            .into_iter()
            .filter(|img| img.feature_id.is_none())
            .collect())
    }

    pub fn images_in_session(&self, session_id: SessionId) -> Result<Vec<ImageRecord>, StoreError> {
        Ok(self
            .images()?
            .into_iter()
            .filter(|img| img.session_id == session_id)
            .collect())
    }

    // ── features ─────────────────────────────────────────────────────────

    pub fn insert_feature(
        &self,
        image_id: ImageId,
        vector: &str,
        created_at: DateTime<Utc>,
    ) -> Result<FeatureRecord, StoreError> {
        let id = self.next_id("feat")?;
        let rec = FeatureRecord {
            id,
            image_id,
            vector: vector.to_string(),
            created_at,
        };
        self.put_json(&keys::feature_key(id), &rec)?;
        Ok(rec)
    }

    pub fn feature(&self, id: FeatureId) -> Result<Option<FeatureRecord>, StoreError> {
        self.get_json(&keys::feature_key(id))
    }

    // ── sessions ─────────────────────────────────────────────────────────

    pub fn insert_session(&self) -> Result<SessionRecord, StoreError> {
        let id = self.next_id("sess")?;
        let rec = SessionRecord {
            id,
            representative: None,
            identity_id: None,
        };
        self.put_json(&keys::session_key(id), &rec)?;
        Ok(rec)
    }

    pub fn session(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        self.get_json(&keys::session_key(id))
    }

    pub fn update_session(&self, rec: &SessionRecord) -> Result<(), StoreError> {
        self.put_json(&keys::session_key(rec.id), rec)
    }

    pub fn sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        self.scan_json(keys::SESSION_PREFIX)
    }

    /// Sessions that have not been aggregated yet.
    pub fn sessions_missing_representative(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self
            .sessions()?
            .into_iter()
            .filter(|s| s.representative.is_none())
            .collect())
    }

    // ── identities ───────────────────────────────────────────────────────

    pub fn insert_identity(
        &self,
        unique_id: &str,
        avatar_key: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<IdentityRecord, StoreError> {
        let id = self.next_id("ident")?;
        let rec = IdentityRecord {
            id,
            unique_id: unique_id.to_string(),
            avatar_key,
            created_at,
        };
        self.put_json(&keys::identity_key(id), &rec)?;
        Ok(rec)
    }

    pub fn identity(&self, id: IdentityId) -> Result<Option<IdentityRecord>, StoreError> {
        self.get_json(&keys::identity_key(id))
    }

    pub fn identities(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        self.scan_json(keys::IDENTITY_PREFIX)
    }

    // ── cascade ──────────────────────────────────────────────────────────

    /// Removes a cascade's pre-computed closure of records in one backend
    /// call: the listed images and features plus the session record.
    pub fn delete_closure(
        &self,
        images: &[ImageId],
        features: &[FeatureId],
        session: SessionId,
    ) -> Result<(), StoreError> {
        let mut doomed = Vec::with_capacity(images.len() + features.len() + 1);
        doomed.extend(images.iter().map(|&id| keys::image_key(id)));
        doomed.extend(features.iter().map(|&id| keys::feature_key(id)));
        doomed.push(keys::session_key(session));
        self.kv.remove_many(&doomed)
    }
}
