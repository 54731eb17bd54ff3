use photark_faces::{FaceCollection, FaceRecord, IdentityId, NameSource};
use tracing::warn;

use crate::config::MatchConfig;
use crate::error::RecognizeError;
use crate::scorer::FaceScorer;

/// Coarse score cutoff applied before the top-K selection. Not the final
/// acceptance threshold.
pub const COARSE_CUTOFF: f32 = 0.20;

/// Maximum number of candidate identities returned per subject face.
pub const MAX_CANDIDATES: usize = 3;

/// Allocator for synthetic negative identity ids, used for reference faces
/// of unnamed people so that repeated unnamed individuals can be matched
/// against each other without colliding with named identities.
///
/// Explicit state handed to the index builder; intentionally not a global.
#[derive(Debug, Clone)]
pub struct UnknownIdAlloc {
    next: IdentityId,
}

impl UnknownIdAlloc {
    pub fn new() -> Self {
        Self { next: -1 }
    }

    /// Ensures future ids are strictly below `id`.
    pub fn reserve_below(&mut self, id: IdentityId) {
        if id <= self.next {
            self.next = id - 1;
        }
    }

    pub fn next_id(&mut self) -> IdentityId {
        let id = self.next;
        self.next -= 1;
        id
    }
}

impl Default for UnknownIdAlloc {
    fn default() -> Self {
        Self::new()
    }
}

/// A labeled reference face held by the index.
#[derive(Debug, Clone)]
pub struct TargetFace {
    /// Identity this face is evidence for. Negative for unnamed people.
    pub identity: IdentityId,
    pub face: FaceRecord,
}

/// One candidate returned by [`TargetFaceIndex::find_candidates`].
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub identity: IdentityId,
    pub score: f32,
    /// Index of the matched face, for [`TargetFaceIndex::target`].
    pub target: usize,
}

/// The searchable set of labeled reference faces, sorted ascending by
/// identity so that all faces of one identity form a contiguous run.
///
/// The search is an exact linear scan. Reference sets are small relative
/// to photo counts, so no approximate index is needed; any replacement
/// must preserve the per-identity-best and top-K tie-break contract.
#[derive(Debug, Default)]
pub struct TargetFaceIndex {
    targets: Vec<TargetFace>,
}

impl TargetFaceIndex {
    /// Builds the index from all manually-defined faces of a collection.
    ///
    /// Named (Manual-Known) faces pass a quality gate: detector-OK (unless
    /// `include_non_ok`) and frontal ratio within the configured window.
    /// Manual-Unknown and all Corrected faces are routed to the unknown
    /// bucket and bound to synthetic negative identities: an existing
    /// negative label id is kept, anything else gets a fresh id from
    /// `alloc`, in order of existing id ascending then discovery order.
    ///
    /// Fails on a known face with zero labels. Faces without an embedding
    /// are skipped; truly missing vectors are logged as advisory.
    pub fn build(
        faces: &FaceCollection,
        cfg: &MatchConfig,
        alloc: &mut UnknownIdAlloc,
    ) -> Result<Self, RecognizeError> {
        let mut targets = Vec::new();
        let mut unknown: Vec<(Option<IdentityId>, &FaceRecord)> = Vec::new();

        for face in faces.iter() {
            if !face.source.is_manual_defined() {
                continue;
            }
            if !face.has_embedding() {
                if face.embedding_missing() && face.face_count > 0 {
                    warn!(face = %face.id, "reference face has no embedding, skipping");
                }
                continue;
            }
            if face.source.is_known() && face.names.is_empty() {
                return Err(RecognizeError::TargetWithoutLabel { face_id: face.id.clone() });
            }

            match face.source {
                NameSource::Manual { known: true } => {
                    if !(face.face_ok || cfg.include_non_ok) {
                        continue;
                    }
                    if face.face_ratio < cfg.ratio_lo || face.face_ratio > cfg.ratio_hi {
                        continue;
                    }
                    targets.push(TargetFace {
                        identity: face.names[0].identity,
                        face: face.clone(),
                    });
                }
                _ => {
                    // Manual-Unknown or Corrected.
                    let existing = face
                        .names
                        .first()
                        .map(|n| n.identity)
                        .filter(|&id| id < 0);
                    unknown.push((existing, face));
                }
            }
        }

        // Keep existing negative ids stable across rebuilds.
        for (existing, _) in &unknown {
            if let Some(id) = *existing {
                alloc.reserve_below(id);
            }
        }
        unknown.sort_by_key(|u| u.0.unwrap_or(IdentityId::MAX));
        for (existing, face) in unknown {
            let identity = existing.unwrap_or_else(|| alloc.next_id());
            targets.push(TargetFace { identity, face: face.clone() });
        }

        targets.sort_by_key(|t| t.identity);
        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn target(&self, i: usize) -> &TargetFace {
        &self.targets[i]
    }

    /// Up to [`MAX_CANDIDATES`] best candidate identities for a subject
    /// face, sorted by descending score with ties broken by lower identity
    /// id (lower ids are assumed assigned earlier and verified more often).
    ///
    /// Within one identity only the maximum-scoring reference face
    /// competes; candidates below [`COARSE_CUTOFF`] are dropped. Returns
    /// `None` when nothing clears the cutoff.
    pub fn find_candidates(&self, subject: &FaceRecord, scorer: &FaceScorer) -> Option<Vec<Hit>> {
        let mut top = TopHits::new();

        let mut i = 0;
        while i < self.targets.len() {
            let identity = self.targets[i].identity;
            let mut best_score = f32::NEG_INFINITY;
            let mut best_idx = i;
            while i < self.targets.len() && self.targets[i].identity == identity {
                let s = scorer.score(subject, &self.targets[i].face);
                if s > best_score {
                    best_score = s;
                    best_idx = i;
                }
                i += 1;
            }
            if best_score >= COARSE_CUTOFF {
                top.push(Hit { identity, score: best_score, target: best_idx });
            }
        }

        let hits = top.hits;
        if hits.is_empty() { None } else { Some(hits) }
    }
}

/// Fixed-capacity top-K kept as an insertion-sorted array: score
/// descending, ties by ascending identity.
struct TopHits {
    hits: Vec<Hit>,
}

impl TopHits {
    fn new() -> Self {
        Self { hits: Vec::with_capacity(MAX_CANDIDATES + 1) }
    }

    fn push(&mut self, hit: Hit) {
        let pos = self
            .hits
            .iter()
            .position(|h| hit.score > h.score || (hit.score == h.score && hit.identity < h.identity))
            .unwrap_or(self.hits.len());
        if pos < MAX_CANDIDATES {
            self.hits.insert(pos, hit);
            self.hits.truncate(MAX_CANDIDATES);
        }
    }
}
