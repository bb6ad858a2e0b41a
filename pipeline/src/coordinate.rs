use tracing::{debug, error, info, warn};

use pupil_engine::InferenceEngine;
use pupil_store::IdentityRecord;
use pupil_vectors as vectors;

use crate::error::PipelineError;
use crate::merge::MergePolicy;
use crate::recognize::{self, Candidate, Probe};
use crate::Pipeline;

/// What one similarity sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub avatar_probes: usize,
    pub vector_probes: usize,
    /// Positive verdicts across both sweeps.
    pub matches: usize,
    /// Matches the policy actually merged.
    pub merges: usize,
}

impl Pipeline {
    /// Looks for enrolled identities that are the same person and invokes
    /// the merge decision point for every positive verdict.
    ///
    /// Two sweeps run in order. The avatar sweep re-runs detection and
    /// recognition on each identity's own avatar image, catching
    /// identities created through a no-match fallback that a later
    /// enrollment duplicated. The representative-vector sweep probes with
    /// each session's stored vector (no re-extraction), catching correct
    /// matches that recognition missed at enrollment time.
    pub fn find_and_merge(&self, policy: &dyn MergePolicy) -> Result<MergeReport, PipelineError> {
        let _batch = self.batch.lock();
        let engine = self.load_engine()?;

        let mut report = MergeReport::default();
        self.sweep_avatars(engine.as_ref(), policy, &mut report)?;
        self.sweep_representatives(policy, &mut report)?;
        info!(
            "similarity sweep finished: {} matches over {} avatar and {} vector probes",
            report.matches, report.avatar_probes, report.vector_probes
        );
        Ok(report)
    }

    /// Every aggregated session's representative vector, tagged with the
    /// identity it belongs to.
    pub(crate) fn enrolled_candidates(&self) -> Result<Vec<Candidate>, PipelineError> {
        let mut out = Vec::new();
        for session in self.store.sessions()? {
            let (Some(encoded), Some(identity_id)) = (&session.representative, session.identity_id)
            else {
                continue;
            };
            let Some(identity) = self.store.identity(identity_id)? else {
                error!("session {} links to missing identity {identity_id}", session.id);
                continue;
            };
            match vectors::from_json(encoded) {
                Ok(vector) => out.push(Candidate {
                    identity_id,
                    unique_id: identity.unique_id,
                    vector,
                }),
                Err(err) => error!(
                    "session {} representative vector is undecodable: {err}",
                    session.id
                ),
            }
        }
        Ok(out)
    }

    fn sweep_avatars(
        &self,
        engine: &dyn InferenceEngine,
        policy: &dyn MergePolicy,
        report: &mut MergeReport,
    ) -> Result<(), PipelineError> {
        let candidates = self.enrolled_candidates()?;
        for identity in self.store.identities()? {
            let Some(avatar_key) = identity.avatar_key.as_deref() else {
                debug!("identity {} has no avatar to probe with", identity.unique_id);
                continue;
            };
            let bytes = match self.avatars.read(avatar_key) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("avatar {avatar_key} could not be read: {err}");
                    continue;
                }
            };
            report.avatar_probes += 1;
            let Some(probe) =
                recognize::prepare_probe(self.detector.as_ref(), engine, Probe::Image(bytes))
            else {
                continue;
            };
            self.decide_matches(&identity, &probe, &candidates, policy, report)?;
        }
        Ok(())
    }

    fn sweep_representatives(
        &self,
        policy: &dyn MergePolicy,
        report: &mut MergeReport,
    ) -> Result<(), PipelineError> {
        let candidates = self.enrolled_candidates()?;
        for subject in &candidates {
            let Some(identity) = self.store.identity(subject.identity_id)? else {
                continue;
            };
            report.vector_probes += 1;
            self.decide_matches(&identity, &subject.vector, &candidates, policy, report)?;
        }
        Ok(())
    }

    /// Runs the comparison sweep for one probe. Every verdict for the
    /// probe is collected before any merge decision is made.
    fn decide_matches(
        &self,
        subject: &IdentityRecord,
        probe: &[f32],
        candidates: &[Candidate],
        policy: &dyn MergePolicy,
        report: &mut MergeReport,
    ) -> Result<(), PipelineError> {
        let others: Vec<Candidate> = candidates
            .iter()
            .filter(|c| c.identity_id != subject.id)
            .cloned()
            .collect();
        let verdicts = recognize::sweep(probe, others, self.cfg.match_threshold, self.cfg.workers);
        if verdicts.is_empty() {
            info!("identity {} was not recognized", subject.unique_id);
            return Ok(());
        }
        for verdict in verdicts {
            report.matches += 1;
            info!(
                "identity {} has been recognized as {} (score {:.4})",
                subject.unique_id, verdict.unique_id, verdict.score
            );
            let Some(matched) = self.store.identity(verdict.identity_id)? else {
                continue;
            };
            if let Some(outcome) = policy.merge(subject, &matched)? {
                report.merges += 1;
                info!(
                    "identities merged: canonical {}, retired {}",
                    outcome.canonical, outcome.retired
                );
            }
        }
        Ok(())
    }
}
