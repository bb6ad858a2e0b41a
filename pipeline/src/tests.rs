//! End-to-end pipeline scenarios over in-memory stores.

use std::collections::HashMap;

use parking_lot::Mutex;

use pupil_engine::EngineError;
use pupil_store::{BlobStore, IdentityRecord};
use pupil_vectors as vectors;

use crate::testutil::{fixture, seed_session};
use crate::{MergeOutcome, MergePolicy, PipelineError, Probe};

/// Test policy: records every pair it is asked about and merges toward the
/// lower identity id.
struct RecordingPolicy {
    pairs: Mutex<Vec<(String, String)>>,
}

impl RecordingPolicy {
    fn new() -> Self {
        Self {
            pairs: Mutex::new(Vec::new()),
        }
    }
}

impl MergePolicy for RecordingPolicy {
    fn merge(
        &self,
        subject: &IdentityRecord,
        matched: &IdentityRecord,
    ) -> Result<Option<MergeOutcome>, PipelineError> {
        self.pairs
            .lock()
            .push((subject.unique_id.clone(), matched.unique_id.clone()));
        Ok(Some(MergeOutcome {
            canonical: subject.id.min(matched.id),
            retired: subject.id.max(matched.id),
        }))
    }
}

fn three_image_table() -> HashMap<Vec<u8>, Vec<f32>> {
    let mut table = HashMap::new();
    table.insert(b"a.png".to_vec(), vec![1.0, 2.0, 3.0]);
    table.insert(b"b.png".to_vec(), vec![3.0, 4.0, 5.0]);
    table.insert(b"c.png".to_vec(), vec![5.0, 6.0, 7.0]);
    table
}

#[test]
fn enrollment_end_to_end() {
    let f = fixture(3, three_image_table(), 1);
    let (session, images) = seed_session(
        &f,
        &[
            ("s1/a.png", b"a.png"),
            ("s1/b.png", b"b.png"),
            ("s1/c.png", b"c.png"),
        ],
    );

    let report = f.pipeline.extract_features().unwrap();
    assert_eq!(report.extracted, 3);
    assert_eq!(report.orphans_deleted, 0);
    assert_eq!(report.sessions_deleted, 0);

    let report = f.pipeline.aggregate_sessions().unwrap();
    assert_eq!(report.aggregated, 1);

    let session = f.pipeline.store().session(session.id).unwrap().unwrap();
    let repr = vectors::from_json(session.representative.as_deref().unwrap()).unwrap();
    assert_eq!(repr, vec![3.0, 4.0, 5.0]);

    let identities = f.store.identities().unwrap();
    assert_eq!(identities.len(), 1);
    assert_eq!(session.identity_id, Some(identities[0].id));

    // The avatar is a copy of one of the session's member images.
    let avatar_key = identities[0].avatar_key.as_deref().unwrap();
    assert_eq!(avatar_key, format!("{}.png", identities[0].unique_id));
    let avatar = f.avatars.read(avatar_key).unwrap();
    let member_blobs: Vec<Vec<u8>> = images
        .iter()
        .map(|img| f.images.read(&img.blob_key).unwrap())
        .collect();
    assert!(member_blobs.contains(&avatar));
}

#[test]
fn extract_is_idempotent() {
    let f = fixture(3, three_image_table(), 1);
    seed_session(&f, &[("s1/a.png", b"a.png"), ("s1/b.png", b"b.png")]);

    let first = f.pipeline.extract_features().unwrap();
    assert_eq!(first.extracted, 2);

    let second = f.pipeline.extract_features().unwrap();
    assert_eq!(second.extracted, 0);
    assert_eq!(second.orphans_deleted, 0);
    assert_eq!(second.sessions_deleted, 0);
    assert_eq!(f.store.images().unwrap().len(), 2);
}

#[test]
fn aggregate_is_idempotent() {
    let f = fixture(3, three_image_table(), 1);
    let (session, _) = seed_session(&f, &[("s1/a.png", b"a.png"), ("s1/b.png", b"b.png")]);

    f.pipeline.extract_features().unwrap();
    let first = f.pipeline.aggregate_sessions().unwrap();
    assert_eq!(first.aggregated, 1);

    let before = f.store.session(session.id).unwrap().unwrap();
    let identities_before = f.store.identities().unwrap();

    let second = f.pipeline.aggregate_sessions().unwrap();
    assert_eq!(second.aggregated, 0);

    let after = f.store.session(session.id).unwrap().unwrap();
    assert_eq!(before.representative, after.representative);
    assert_eq!(before.identity_id, after.identity_id);

    let identities_after = f.store.identities().unwrap();
    assert_eq!(identities_before.len(), identities_after.len());
    assert_eq!(
        identities_before[0].unique_id,
        identities_after[0].unique_id
    );
}

#[test]
fn orphan_removed_without_collateral() {
    let f = fixture(3, three_image_table(), 1);
    let (session, images) = seed_session(&f, &[("s1/a.png", b"a.png")]);

    // An image pointing at a session that never existed.
    f.images.write("stray.png", b"a.png").unwrap();
    let orphan = f.store.insert_image(9999, "stray.png").unwrap();

    let report = f.pipeline.extract_features().unwrap();
    assert_eq!(report.orphans_deleted, 1);
    assert_eq!(report.extracted, 1);

    assert!(f.store.image(orphan.id).unwrap().is_none());
    assert!(f.store.image(images[0].id).unwrap().is_some());
    assert!(f.store.session(session.id).unwrap().is_some());
}

#[test]
fn missing_blob_cascades_session() {
    let f = fixture(3, three_image_table(), 1);
    let (doomed, doomed_images) = seed_session(
        &f,
        &[("s1/a.png", b"a.png"), ("s1/b.png", b"b.png")],
    );
    let (other, other_images) = seed_session(&f, &[("s2/c.png", b"c.png")]);

    // First run extracts everything.
    f.pipeline.extract_features().unwrap();

    // One backing file disappears, and a new capture forces a revisit.
    f.images.remove("s1/a.png");
    let mut revisit = f.store.image(doomed_images[0].id).unwrap().unwrap();
    revisit.feature_id = None;
    f.store.update_image(&revisit).unwrap();

    let report = f.pipeline.extract_features().unwrap();
    assert_eq!(report.sessions_deleted, 1);

    assert!(f.store.session(doomed.id).unwrap().is_none());
    for img in &doomed_images {
        assert!(f.store.image(img.id).unwrap().is_none());
    }
    // The untouched session keeps all its records.
    assert!(f.store.session(other.id).unwrap().is_some());
    assert!(f.store.image(other_images[0].id).unwrap().is_some());
}

#[test]
fn extraction_failure_cascades_session() {
    let f = fixture(3, three_image_table(), 1);
    // Blob exists but the engine has no embedding for it.
    let (doomed, _) = seed_session(&f, &[("s1/x.png", b"mystery-bytes")]);
    let (other, _) = seed_session(&f, &[("s2/c.png", b"c.png")]);

    let report = f.pipeline.extract_features().unwrap();
    assert_eq!(report.sessions_deleted, 1);
    assert_eq!(report.extracted, 1);

    assert!(f.store.session(doomed.id).unwrap().is_none());
    assert!(f.store.session(other.id).unwrap().is_some());
}

#[test]
fn model_missing_fails_whole_batch() {
    let f = fixture(3, three_image_table(), 1);
    seed_session(&f, &[("s1/a.png", b"a.png")]);

    std::fs::remove_file(&f.model_path).unwrap();

    let err = f.pipeline.extract_features().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Engine(EngineError::ModelMissing { .. })
    ));
    // Nothing was extracted or deleted.
    assert_eq!(f.store.images_missing_feature().unwrap().len(), 1);
}

#[test]
fn avatar_copy_failure_keeps_identity() {
    let f = fixture(3, three_image_table(), 1);
    seed_session(&f, &[("s1/a.png", b"a.png"), ("s1/b.png", b"b.png")]);

    f.pipeline.extract_features().unwrap();

    // Source images vanish between extraction and aggregation.
    f.images.remove("s1/a.png");
    f.images.remove("s1/b.png");

    let report = f.pipeline.aggregate_sessions().unwrap();
    assert_eq!(report.aggregated, 1);

    let identities = f.store.identities().unwrap();
    assert_eq!(identities.len(), 1);
    assert!(identities[0].avatar_key.is_none());
}

fn two_similar_sessions_table() -> HashMap<Vec<u8>, Vec<f32>> {
    let mut table = HashMap::new();
    table.insert(b"a1".to_vec(), vec![1.0, 0.0, 0.0]);
    table.insert(b"a2".to_vec(), vec![0.99, 0.01, 0.0]);
    table.insert(b"b1".to_vec(), vec![0.98, 0.02, 0.0]);
    table.insert(b"b2".to_vec(), vec![0.97, 0.03, 0.0]);
    table
}

fn enroll_two_sessions(f: &crate::testutil::Fixture) {
    seed_session(f, &[("s1/a1.png", b"a1"), ("s1/a2.png", b"a2")]);
    seed_session(f, &[("s2/b1.png", b"b1"), ("s2/b2.png", b"b2")]);
    f.pipeline.extract_features().unwrap();
    let report = f.pipeline.aggregate_sessions().unwrap();
    assert_eq!(report.aggregated, 2);
}

#[test]
fn find_and_merge_triggers_decision_for_every_match() {
    let f = fixture(3, two_similar_sessions_table(), 1);
    enroll_two_sessions(&f);

    let policy = RecordingPolicy::new();
    let report = f.pipeline.find_and_merge(&policy).unwrap();

    // Both identities match each other in the avatar sweep and again in
    // the representative-vector sweep.
    assert_eq!(report.avatar_probes, 2);
    assert_eq!(report.vector_probes, 2);
    assert_eq!(report.matches, 4);
    assert_eq!(report.merges, 4);

    let identities = f.store.identities().unwrap();
    let (ua, ub) = (&identities[0].unique_id, &identities[1].unique_id);
    let pairs = policy.pairs.lock();
    assert!(pairs.contains(&(ua.clone(), ub.clone())));
    assert!(pairs.contains(&(ub.clone(), ua.clone())));
}

#[test]
fn find_and_merge_below_threshold_finds_nothing() {
    let mut table = HashMap::new();
    table.insert(b"a1".to_vec(), vec![1.0, 0.0, 0.0]);
    table.insert(b"b1".to_vec(), vec![0.0, 1.0, 0.0]);
    let f = fixture(3, table, 1);
    seed_session(&f, &[("s1/a1.png", b"a1")]);
    seed_session(&f, &[("s2/b1.png", b"b1")]);
    f.pipeline.extract_features().unwrap();
    f.pipeline.aggregate_sessions().unwrap();

    let policy = RecordingPolicy::new();
    let report = f.pipeline.find_and_merge(&policy).unwrap();
    assert_eq!(report.matches, 0);
    assert_eq!(report.merges, 0);
    assert!(policy.pairs.lock().is_empty());
}

#[test]
fn ambiguous_avatar_detection_is_not_an_error() {
    // Detector reports two faces in every avatar: the avatar sweep yields
    // no verdicts, the vector sweep still works.
    let f = fixture(3, two_similar_sessions_table(), 2);
    enroll_two_sessions(&f);

    let policy = RecordingPolicy::new();
    let report = f.pipeline.find_and_merge(&policy).unwrap();
    assert_eq!(report.avatar_probes, 2);
    assert_eq!(report.matches, 2, "only the vector sweep can match");
}

#[test]
fn recognize_image_probe() {
    let f = fixture(3, two_similar_sessions_table(), 1);
    seed_session(&f, &[("s1/a1.png", b"a1"), ("s1/a2.png", b"a2")]);
    f.pipeline.extract_features().unwrap();
    f.pipeline.aggregate_sessions().unwrap();

    let matched = f.pipeline.recognize(Probe::Image(b"a1".to_vec())).unwrap();
    let identities = f.store.identities().unwrap();
    assert_eq!(matched.unwrap().unique_id, identities[0].unique_id);
}

#[test]
fn recognize_without_single_face_yields_none() {
    let f = fixture(3, two_similar_sessions_table(), 0);
    seed_session(&f, &[("s1/a1.png", b"a1")]);
    f.pipeline.extract_features().unwrap();
    f.pipeline.aggregate_sessions().unwrap();

    let matched = f.pipeline.recognize(Probe::Image(b"a1".to_vec())).unwrap();
    assert!(matched.is_none());
}

#[test]
fn recognize_vector_probe_skips_detection() {
    // Detector would report zero faces, but a vector probe never asks it.
    let f = fixture(3, two_similar_sessions_table(), 0);
    seed_session(&f, &[("s1/a1.png", b"a1")]);
    f.pipeline.extract_features().unwrap();
    f.pipeline.aggregate_sessions().unwrap();

    let matched = f
        .pipeline
        .recognize(Probe::Vector(vec![1.0, 0.0, 0.0]))
        .unwrap();
    assert!(matched.is_some());
}
