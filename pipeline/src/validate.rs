use tracing::{info, warn};

use pupil_store::{BlobStore, ImageId, ImageRecord, RecordStore, SessionId};

use crate::error::PipelineError;

/// Validity of a stored image record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Validity {
    Valid,
    /// No enrollment session record exists for the image.
    Orphaned,
    /// The backing image bytes are gone from the blob store.
    MissingBlob,
}

pub(crate) fn check_image(
    store: &RecordStore,
    blobs: &dyn BlobStore,
    image: &ImageRecord,
) -> Result<Validity, PipelineError> {
    if store.session(image.session_id)?.is_none() {
        return Ok(Validity::Orphaned);
    }
    if !blobs.exists(&image.blob_key) {
        return Ok(Validity::MissingBlob);
    }
    Ok(Validity::Valid)
}

/// Deletes an orphaned image. Only this one record is touched.
pub(crate) fn delete_orphan(
    store: &RecordStore,
    image: &ImageRecord,
) -> Result<(), PipelineError> {
    store.delete_image(image.id)?;
    info!("image {} deleted, no enrollment session exists for it", image.id);
    Ok(())
}

/// Cascading delete of an unrecoverable session.
///
/// The closure is computed up front, then removed in one batched call:
/// every member image that already has a feature, each of those features,
/// the session record, and the offending image. Members without features
/// are left behind and reclaimed as orphans on a later run.
pub(crate) fn cascade_delete(
    store: &RecordStore,
    session_id: SessionId,
    offending: ImageId,
    reason: &str,
) -> Result<(), PipelineError> {
    let members = store.images_in_session(session_id)?;
    let mut images = Vec::new();
    let mut features = Vec::new();
    for member in &members {
        if let Some(feature_id) = member.feature_id {
            images.push(member.id);
            features.push(feature_id);
        }
    }
    if !images.contains(&offending) {
        images.push(offending);
    }
    store.delete_closure(&images, &features, session_id)?;
    warn!(
        "session {session_id} deleted recursively ({} images, {} features) because {reason}",
        images.len(),
        features.len()
    );
    Ok(())
}
