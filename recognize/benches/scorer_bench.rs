use criterion::{Criterion, black_box, criterion_group, criterion_main};
use photark_faces::{FaceCollection, FaceName, FaceRecord, NameSource};
use photark_recognize::{FaceScorer, MatchConfig, TargetFaceIndex, UnknownIdAlloc};

/// Deterministic pseudo-embedding: unit-norm, dimension `dim`, varied by
/// `seed` so identities do not collapse onto one vector.
fn make_embedding(dim: usize, seed: u64) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dim)
        .map(|i| {
            let x = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(seed);
            ((x >> 33) as f32 / (1u64 << 31) as f32) - 0.5
        })
        .collect();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut v {
        *x /= norm;
    }
    v
}

fn make_face(photo: &str, seed: u64) -> FaceRecord {
    let mut f = FaceRecord::new(photo, 0, 1);
    f.embedding = Some(make_embedding(512, seed));
    f.height = 300;
    f.face_ratio = 1.0;
    f.face_ok = true;
    f
}

fn bench_score(c: &mut Criterion) {
    let scorer = FaceScorer::new(&[1.0, 1.0, 0.95, 0.9]);
    let subject = make_face("subject", 1);
    let target = make_face("target", 2);

    c.bench_function("score_512d", |b| {
        b.iter(|| black_box(scorer.score(black_box(&subject), black_box(&target))));
    });
}

fn bench_find_candidates(c: &mut Criterion) {
    // 500 reference faces across 100 identities, 5 faces each.
    let mut refs = Vec::new();
    for identity in 0..100i64 {
        for face in 0..5u64 {
            let mut f = make_face(&format!("ref{identity}x{face}"), identity as u64 * 31 + face);
            f.source = NameSource::Manual { known: true };
            f.names = vec![FaceName { identity, score: 1.0, explain: None, name: None }];
            refs.push(f);
        }
    }
    let cfg = MatchConfig::default();
    let mut alloc = UnknownIdAlloc::new();
    let index = TargetFaceIndex::build(&FaceCollection::from_faces(refs), &cfg, &mut alloc).unwrap();
    let scorer = FaceScorer::new(&cfg.face_count_factors);
    let subject = make_face("subject", 7 * 31);

    c.bench_function("find_candidates_500refs_512d", |b| {
        b.iter(|| black_box(index.find_candidates(black_box(&subject), &scorer)));
    });
}

criterion_group!(benches, bench_score, bench_find_candidates);
criterion_main!(benches);
