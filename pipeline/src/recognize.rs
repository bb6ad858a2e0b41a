use std::sync::mpsc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use pupil_engine::{FaceDetector, InferenceEngine};
use pupil_store::{IdentityId, IdentityRecord};
use pupil_vectors::cosine_sim;

use crate::error::PipelineError;
use crate::Pipeline;

/// Input to recognition: raw image bytes (face detection and extraction
/// still needed) or an already-computed embedding.
pub enum Probe {
    Image(Vec<u8>),
    Vector(Vec<f32>),
}

/// One enrolled identity's representative vector, ready to compare against.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub identity_id: IdentityId,
    pub unique_id: String,
    pub vector: Vec<f32>,
}

/// A comparison outcome above the acceptance threshold.
#[derive(Debug, Clone)]
pub(crate) struct Verdict {
    pub identity_id: IdentityId,
    pub unique_id: String,
    pub score: f32,
}

/// Turns a probe into an embedding vector.
///
/// Image probes must contain exactly one detectable face. Zero or multiple
/// faces, and any detection or extraction failure, yield `None`: the probe
/// is unusable, which downstream treats as non-match, never as an error.
pub(crate) fn prepare_probe(
    detector: &dyn FaceDetector,
    engine: &dyn InferenceEngine,
    probe: Probe,
) -> Option<Vec<f32>> {
    match probe {
        Probe::Vector(vector) => Some(vector),
        Probe::Image(bytes) => {
            let faces = match detector.detect_and_crop(&bytes) {
                Ok(faces) => faces,
                Err(err) => {
                    warn!("face detection failed: {err}");
                    return None;
                }
            };
            if faces.len() != 1 {
                debug!(
                    "{} faces detected, recognition needs exactly one",
                    faces.len()
                );
                return None;
            }
            match engine.infer(&faces[0].crop) {
                Ok(vector) => Some(vector),
                Err(err) => {
                    warn!("probe extraction failed: {err}");
                    None
                }
            }
        }
    }
}

/// Compares a probe against every candidate on a bounded worker pool and
/// returns the positive verdicts, best score first.
///
/// Each comparison is an independent unit of work pulled off a shared job
/// queue; the call blocks until all of them have reported. Worker-side
/// failures (for example a stored vector of the wrong length) are logged
/// and fail open to non-match.
pub(crate) fn sweep(
    probe: &[f32],
    candidates: Vec<Candidate>,
    threshold: f32,
    workers: usize,
) -> Vec<Verdict> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, candidates.len());
    let jobs = Mutex::new(candidates.into_iter());
    let (tx, rx) = mpsc::channel::<Verdict>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let jobs = &jobs;
            scope.spawn(move || {
                loop {
                    let Some(candidate) = jobs.lock().next() else {
                        break;
                    };
                    if candidate.vector.len() != probe.len() {
                        warn!(
                            "identity {} has a {}-dim representative vector, probe is {}-dim",
                            candidate.unique_id,
                            candidate.vector.len(),
                            probe.len()
                        );
                        continue;
                    }
                    let score = cosine_sim(probe, &candidate.vector);
                    let verdict = Verdict {
                        identity_id: candidate.identity_id,
                        unique_id: candidate.unique_id,
                        score,
                    };
                    if tx.send(verdict).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut verdicts: Vec<Verdict> = rx.iter().filter(|v| v.score >= threshold).collect();
        verdicts.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.identity_id.cmp(&b.identity_id))
        });
        verdicts
    })
}

impl Pipeline {
    /// Recognizes one probe against the whole enrolled population.
    ///
    /// Returns the best-matching identity over the acceptance threshold,
    /// or `None` when the probe is unusable or nothing matches.
    pub fn recognize(&self, probe: Probe) -> Result<Option<IdentityRecord>, PipelineError> {
        let _batch = self.batch.lock();
        let engine = self.load_engine()?;

        let Some(vector) = prepare_probe(self.detector.as_ref(), engine.as_ref(), probe) else {
            return Ok(None);
        };
        let candidates = self.enrolled_candidates()?;
        let verdicts = sweep(
            &vector,
            candidates,
            self.cfg.match_threshold,
            self.cfg.workers,
        );
        let Some(best) = verdicts.first() else {
            return Ok(None);
        };
        Ok(self.store.identity(best.identity_id)?)
    }
}
