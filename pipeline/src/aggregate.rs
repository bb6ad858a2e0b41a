use chrono::Utc;
use rand::Rng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pupil_store::{IdentityRecord, ImageRecord};
use pupil_vectors as vectors;

use crate::error::PipelineError;
use crate::Pipeline;

/// What one aggregation batch did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AggregateReport {
    /// Sessions that received a representative vector and an identity.
    pub aggregated: usize,
    /// Sessions left alone (no images yet, features incomplete, or
    /// inconsistent data).
    pub skipped: usize,
}

impl Pipeline {
    /// Computes the representative vector for every session that lacks one
    /// and creates its identity.
    ///
    /// A session is ready once every member image has a feature; anything
    /// less is skipped and picked up on a later run. Already-aggregated
    /// sessions are never revisited, so running this twice changes
    /// nothing.
    pub fn aggregate_sessions(&self) -> Result<AggregateReport, PipelineError> {
        let _batch = self.batch.lock();

        let pending = self.store.sessions_missing_representative()?;
        info!("{} sessions awaiting aggregation", pending.len());

        let mut report = AggregateReport::default();
        for mut session in pending {
            let members = self.store.images_in_session(session.id)?;
            if members.is_empty() {
                debug!("session {} has no images yet", session.id);
                report.skipped += 1;
                continue;
            }

            let Some(rows) = self.member_vectors(&members)? else {
                report.skipped += 1;
                continue;
            };

            let mean = match vectors::mean(&rows) {
                Ok(mean) => mean,
                Err(err) => {
                    error!("session {} features are inconsistent: {err}", session.id);
                    report.skipped += 1;
                    continue;
                }
            };

            let identity = self.create_identity(&members)?;
            session.representative = Some(vectors::to_json(&mean));
            session.identity_id = Some(identity.id);
            self.store.update_session(&session)?;
            info!(
                "session {} aggregated into identity {}",
                session.id, identity.unique_id
            );
            report.aggregated += 1;
        }
        Ok(report)
    }

    /// Loads and decodes the feature vector of every member image.
    /// Returns `None` when the session is not ready or its data is bad.
    fn member_vectors(
        &self,
        members: &[ImageRecord],
    ) -> Result<Option<Vec<Vec<f32>>>, PipelineError> {
        let mut rows = Vec::with_capacity(members.len());
        for member in members {
            let Some(feature_id) = member.feature_id else {
                debug!("image {} has no feature yet", member.id);
                return Ok(None);
            };
            let Some(feature) = self.store.feature(feature_id)? else {
                error!("image {} references missing feature {feature_id}", member.id);
                return Ok(None);
            };
            match vectors::from_json(&feature.vector) {
                Ok(row) => rows.push(row),
                Err(err) => {
                    error!("feature {} is undecodable: {err}", feature.id);
                    return Ok(None);
                }
            }
        }
        Ok(Some(rows))
    }

    /// Creates the identity for a freshly aggregated session.
    ///
    /// The avatar source is a uniformly random member image; a failed copy
    /// leaves the identity without an avatar but does not fail creation.
    fn create_identity(&self, members: &[ImageRecord]) -> Result<IdentityRecord, PipelineError> {
        let unique_id = Uuid::new_v4().to_string();
        let pick = self.rng.lock().gen_range(0..members.len());
        let source = &members[pick];

        let avatar_key = format!("{unique_id}.png");
        let avatar_key = match self.copy_avatar(&source.blob_key, &avatar_key) {
            Ok(()) => Some(avatar_key),
            Err(err) => {
                warn!(
                    "avatar could not be created from {}: {err}",
                    source.blob_key
                );
                None
            }
        };

        let identity = self.store.insert_identity(&unique_id, avatar_key, Utc::now())?;
        info!("identity {} created", identity.unique_id);
        Ok(identity)
    }

    fn copy_avatar(&self, source_key: &str, avatar_key: &str) -> Result<(), PipelineError> {
        let bytes = self.images.read(source_key)?;
        self.avatars.write(avatar_key, &bytes)?;
        Ok(())
    }
}
