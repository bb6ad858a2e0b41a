//! Persistence for enrollment data.
//!
//! Records (images, features, sessions, identities) live in a typed layer
//! ([`RecordStore`]) over a plain key-value backend; [`MemoryKv`] serves
//! tests and ephemeral use, [`RedbKv`] is the embedded on-device backend.
//! Image and avatar bytes live separately behind [`BlobStore`].
//!
//! Every backend operation is atomic per record. Multi-record consistency
//! (the cascading delete closure) is handled by [`RecordStore::delete_closure`],
//! which removes a pre-computed set of keys in one backend call.

mod blob;
mod error;
pub mod keys;
mod kv;
mod records;
mod types;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use error::StoreError;
pub use kv::{KvBackend, MemoryKv, RedbKv};
pub use records::RecordStore;
pub use types::{
    FeatureId, FeatureRecord, IdentityId, IdentityRecord, ImageId, ImageRecord, SessionId,
    SessionRecord,
};
