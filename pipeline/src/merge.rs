use tracing::info;

use pupil_store::{IdentityId, IdentityRecord};

use crate::error::PipelineError;

/// Outcome of merging two identities found to be the same person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub canonical: IdentityId,
    pub retired: IdentityId,
}

/// Decision point invoked for every positive recognition verdict.
///
/// Contract: given two identities believed to be the same person, produce
/// one canonical identity and retire the other. Returning `Ok(None)`
/// records the match without combining any records; how enrollment history
/// is reconciled is a product decision left to the implementation.
pub trait MergePolicy: Send + Sync {
    fn merge(
        &self,
        subject: &IdentityRecord,
        matched: &IdentityRecord,
    ) -> Result<Option<MergeOutcome>, PipelineError>;
}

/// Default policy: log the pair and leave both identities untouched.
pub struct LogOnlyMerge;

impl MergePolicy for LogOnlyMerge {
    fn merge(
        &self,
        subject: &IdentityRecord,
        matched: &IdentityRecord,
    ) -> Result<Option<MergeOutcome>, PipelineError> {
        info!(
            "identities {} and {} are believed to be the same person",
            subject.unique_id, matched.unique_id
        );
        Ok(None)
    }
}
