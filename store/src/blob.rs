use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::StoreError;

/// Byte storage for captured images and avatars.
///
/// Keys are relative path-like strings (`"s1/a.png"`, `"{unique_id}.png"`).
/// Implementations must be safe for concurrent use.
pub trait BlobStore: Send + Sync {
    fn exists(&self, key: &str) -> bool;
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;
}

/// In-memory [`BlobStore`] for tests and ephemeral use.
pub struct MemoryBlobStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }

    /// Drops a blob, simulating a file lost on disk.
    pub fn remove(&self, key: &str) {
        self.data.lock().remove(key);
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryBlobStore {
    fn exists(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.data
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::BlobMissing(key.to_string()))
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.data.lock().insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

/// Filesystem [`BlobStore`] rooted at a directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl BlobStore for FsBlobStore {
    fn exists(&self, key: &str) -> bool {
        self.path_of(key).is_file()
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_of(key);
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobMissing(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path_of(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(())
    }
}
