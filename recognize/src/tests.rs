//! Cross-module scenario tests: index build + matching + disambiguation +
//! promotion + full-run reconciliation wired together.

use photark_faces::{FaceCollection, FaceName, FaceRecord, IdentityId, NameSource, RelBox};

use crate::config::MatchConfig;
use crate::reconcile::{MatchReconciler, NoNames, audit_regressions, count_photo_faces};
use crate::targets::{TargetFaceIndex, UnknownIdAlloc};

fn detected(photo: &str, index: u32, count: u32, embedding: Vec<f32>) -> FaceRecord {
    let mut f = FaceRecord::new(photo, index, count);
    f.embedding = Some(embedding);
    f.height = 300;
    f.face_ratio = 1.0;
    f.face_ok = true;
    f
}

fn reference(photo: &str, identity: IdentityId, embedding: Vec<f32>) -> FaceRecord {
    let mut f = detected(photo, 0, 1, embedding);
    f.source = NameSource::Manual { known: true };
    f.names = vec![FaceName { identity, score: 1.0, explain: None, name: None }];
    f
}

fn cfg() -> MatchConfig {
    MatchConfig {
        threshold: 0.5,
        face_count_factors: vec![1.0, 1.0, 1.0],
        ..Default::default()
    }
}

fn index_of(references: Vec<FaceRecord>) -> TargetFaceIndex {
    let refs = FaceCollection::from_faces(references);
    let mut alloc = UnknownIdAlloc::new();
    TargetFaceIndex::build(&refs, &cfg(), &mut alloc).unwrap()
}

#[test]
fn perfect_match_promotes_to_auto_known() {
    // Subject embedding identical to the identity-7 reference, frontal,
    // 300 px, single face: every factor is 1, so the score is exactly 1.
    let emb = vec![0.6, 0.8, 0.0, 0.0];
    let index = index_of(vec![reference("ref1", 7, emb.clone())]);
    let r = MatchReconciler::new(cfg(), index, &NoNames);

    let mut faces = FaceCollection::from_faces(vec![detected("p", 0, 1, emb)]);
    let dirty = r.run(&mut faces).unwrap();

    let face = faces.get("p~0").unwrap();
    assert_eq!(face.source, NameSource::Auto { known: true });
    assert_eq!(face.names.len(), 1);
    assert_eq!(face.names[0].identity, 7);
    assert!((face.names[0].score - 1.0).abs() < 1e-6);
    assert!(face.names[0].explain.is_some());
    assert_eq!(dirty, ["p~0"]);
}

#[test]
fn contested_identity_resolves_to_one_face() {
    // Both faces of one photo top-match identity 7. The runner-up's only
    // fallback (identity 3 at 0.50) is below 0.8 x 0.85, so it goes
    // unmatched instead of stealing the identity.
    let e7 = vec![1.0, 0.0, 0.0, 0.0];
    let e3 = vec![0.0, 0.0, 1.0, 0.0];
    let index = index_of(vec![reference("ref1", 7, e7), reference("ref2", 3, e3)]);
    let r = MatchReconciler::new(cfg(), index, &NoNames);

    let a = detected("p", 0, 2, vec![0.90, (1.0f32 - 0.81).sqrt(), 0.0, 0.0]);
    let b = detected("p", 1, 2, vec![0.85, 0.0, 0.50, (1.0f32 - 0.7225 - 0.25).sqrt()]);
    let mut faces = FaceCollection::from_faces(vec![a, b]);
    r.run(&mut faces).unwrap();

    let a = faces.get("p~0").unwrap();
    assert_eq!(a.source, NameSource::Auto { known: true });
    assert_eq!(a.names[0].identity, 7);

    let b = faces.get("p~1").unwrap();
    assert_eq!(b.source, NameSource::NotAssigned);
    assert!(b.names.is_empty());
}

#[test]
fn below_threshold_face_stays_unassigned() {
    let index = index_of(vec![reference("ref1", 7, vec![1.0, 0.0])]);
    let r = MatchReconciler::new(cfg(), index, &NoNames);

    // dot = 0.40: above the coarse cutoff, below the 0.5 threshold.
    let mut faces = FaceCollection::from_faces(vec![detected(
        "p",
        0,
        1,
        vec![0.40, (1.0f32 - 0.16).sqrt()],
    )]);
    let dirty = r.run(&mut faces).unwrap();

    let face = faces.get("p~0").unwrap();
    assert_eq!(face.source, NameSource::NotAssigned);
    assert!(face.names.is_empty());
    assert!(dirty.is_empty());
}

#[test]
fn incremental_run_leaves_manual_faces_untouched() {
    let emb = vec![1.0, 0.0];
    let index = index_of(vec![reference("ref1", 7, emb.clone())]);
    let r = MatchReconciler::new(cfg(), index, &NoNames);

    // A curated face bound to a different identity than matching would
    // produce; it must come out exactly as it went in.
    let mut manual = detected("p", 0, 1, emb);
    manual.source = NameSource::Corrected { known: true };
    manual.names = vec![FaceName { identity: 42, score: 1.0, explain: None, name: None }];

    let mut faces = FaceCollection::from_faces(vec![manual]);
    let dirty = r.run(&mut faces).unwrap();

    let face = faces.get("p~0").unwrap();
    assert_eq!(face.source, NameSource::Corrected { known: true });
    assert_eq!(face.names[0].identity, 42);
    assert!(dirty.is_empty());
}

#[test]
fn missing_embedding_aborts_run() {
    let index = index_of(vec![reference("ref1", 7, vec![1.0, 0.0])]);
    let r = MatchReconciler::new(cfg(), index, &NoNames);

    let bare = FaceRecord::new("p", 0, 1);
    let mut faces = FaceCollection::from_faces(vec![bare]);
    assert!(r.run(&mut faces).is_err());
}

#[test]
fn no_face_sentinel_passes_through() {
    let index = index_of(vec![reference("ref1", 7, vec![1.0, 0.0])]);
    let r = MatchReconciler::new(cfg(), index, &NoNames);

    // Scanned photo without any face: no embedding, and that is fine.
    let mut faces = FaceCollection::from_faces(vec![FaceRecord::new("p", 0, 0)]);
    let dirty = r.run(&mut faces).unwrap();
    assert!(dirty.is_empty());
}

#[test]
fn full_run_carries_labels_by_overlap() {
    // Previous snapshot: photo "p" with a hand-labeled identity-4 face.
    let mut old = reference("p", 4, vec![0.0, 1.0]);
    old.rect = RelBox::new(0.10, 0.10, 0.20, 0.20);
    let mut previous = FaceCollection::from_faces(vec![old]);

    // Fresh detection of the same photo: slightly different box, new
    // embedding that would NOT match anything in the index.
    let mut fresh_face = detected("p", 0, 1, vec![1.0, 0.0]);
    fresh_face.rect = RelBox::new(0.11, 0.09, 0.19, 0.21);
    let mut fresh = FaceCollection::from_faces(vec![fresh_face]);

    let index = index_of(vec![reference("ref1", 9, vec![0.0, 1.0])]);
    let r = MatchReconciler::new(cfg(), index, &NoNames);
    r.run_full(&mut previous, &mut fresh).unwrap();

    // Label survived without re-matching, donor consumed.
    let face = fresh.get("p~0").unwrap();
    assert_eq!(face.source, NameSource::Manual { known: true });
    assert_eq!(face.names[0].identity, 4);
    assert!(!previous.get("p~0").unwrap().has_embedding());
    assert!(!previous.get("p~0").unwrap().embedding_missing());
}

#[test]
fn full_run_regression_is_advisory_only() {
    // Photo "p" had two manual faces; the re-detection found one. The run
    // must complete and the audit must count exactly one regressed photo.
    let mut m0 = reference("p", 4, vec![1.0, 0.0]);
    m0.face_count = 2;
    m0.rect = RelBox::new(0.1, 0.1, 0.2, 0.2);
    let mut m1 = reference("p", 5, vec![0.0, 1.0]);
    m1.id = "p~1".into();
    m1.face_count = 2;
    m1.rect = RelBox::new(0.6, 0.6, 0.2, 0.2);
    let mut previous = FaceCollection::from_faces(vec![m0, m1]);

    let mut fresh_face = detected("p", 0, 1, vec![1.0, 0.0]);
    fresh_face.rect = RelBox::new(0.1, 0.1, 0.2, 0.2);
    let mut fresh = FaceCollection::from_faces(vec![fresh_face]);

    let index = TargetFaceIndex::default();
    let r = MatchReconciler::new(cfg(), index, &NoNames);
    r.run_full(&mut previous, &mut fresh).unwrap();

    assert_eq!(
        audit_regressions(&count_photo_faces(&previous), &count_photo_faces(&fresh)),
        1
    );
}
