use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Utc;
use photark_faces::{Candidate, FaceCollection, FaceName, FaceRecord, IdentityId, NameSource, RelBox};
use tracing::{debug, warn};

use crate::config::MatchConfig;
use crate::error::RecognizeError;
use crate::scorer::FaceScorer;
use crate::targets::TargetFaceIndex;

/// When disambiguation forces a face onto its next-best candidate, that
/// candidate must score at least this fraction of the face's original top
/// score, or the face is dropped to unmatched for the run.
pub const RETENTION_RATIO: f32 = 0.80;

/// Resolves display names for known identities, cached into labels at
/// promotion time. Synthetic negative identities have no name.
pub trait NameLookup {
    fn display_name(&self, identity: IdentityId) -> Option<String>;
}

/// A [`NameLookup`] with no names available.
pub struct NoNames;

impl NameLookup for NoNames {
    fn display_name(&self, _identity: IdentityId) -> Option<String> {
        None
    }
}

impl NameLookup for HashMap<IdentityId, String> {
    fn display_name(&self, identity: IdentityId) -> Option<String> {
        self.get(&identity).cloned()
    }
}

/// Matches detected faces against the reference index, resolves per-photo
/// identity conflicts, and promotes accepted candidates into labels.
///
/// Photos are processed one group at a time in ordinal id order. The
/// reconciler itself is read-only once built; all mutation happens on the
/// face records passed in.
pub struct MatchReconciler<'a> {
    cfg: MatchConfig,
    scorer: FaceScorer,
    index: TargetFaceIndex,
    names: &'a dyn NameLookup,
}

impl<'a> MatchReconciler<'a> {
    pub fn new(cfg: MatchConfig, index: TargetFaceIndex, names: &'a dyn NameLookup) -> Self {
        let cfg = cfg.sanitized();
        let scorer = FaceScorer::new(&cfg.face_count_factors);
        Self { cfg, scorer, index, names }
    }

    pub fn index(&self) -> &TargetFaceIndex {
        &self.index
    }

    /// Attaches candidate identities to one face.
    ///
    /// Manually-defined faces are authoritative and skipped. Any other face
    /// must carry an embedding; a missing one means the upstream pipeline
    /// is corrupt and fails the run. Candidates are kept only when the best
    /// hit clears the configured acceptance threshold.
    pub fn match_face(&self, face: &mut FaceRecord) -> Result<(), RecognizeError> {
        if face.source.is_manual_defined() {
            return Ok(());
        }
        face.candidates.clear();
        if !face.has_embedding() {
            return Err(RecognizeError::MissingEmbedding { face_id: face.id.clone() });
        }
        let Some(hits) = self.index.find_candidates(face, &self.scorer) else {
            return Ok(());
        };
        if hits[0].score < self.cfg.threshold {
            return Ok(());
        }
        let mut explain = Some(self.scorer.explain(face, &self.index.target(hits[0].target).face));
        face.candidates = hits
            .iter()
            .map(|h| Candidate {
                identity: h.identity,
                score: h.score,
                explain: explain.take().unwrap_or_default(),
                source: self.index.target(h.target).face.source,
            })
            .collect();
        Ok(())
    }

    /// Promotes the face's candidates into labels, or clears stale labels
    /// when no candidate survived. Returns true when the record changed.
    ///
    /// Candidates are cleared in every case; this call is one-shot.
    pub fn assign_and_clear_candidates(&self, face: &mut FaceRecord) -> bool {
        if face.source.is_manual_defined() {
            face.candidates.clear();
            return false;
        }

        if face.candidates.is_empty() {
            face.source = NameSource::NotAssigned;
            if face.names.is_empty() {
                return false;
            }
            face.names.clear();
            face.updated_at = Utc::now();
            face.dirty = true;
            return true;
        }

        // The assigned face inherits the known flag of the reference face
        // its best candidate matched.
        face.source = face.candidates[0].source.to_auto();
        let changed = !face.names_match(&face.candidates);
        if changed {
            face.names = face
                .candidates
                .iter()
                .map(|c| FaceName {
                    identity: c.identity,
                    score: c.score,
                    explain: (!c.explain.is_empty()).then(|| c.explain.clone()),
                    name: self.names.display_name(c.identity),
                })
                .collect();
            face.updated_at = Utc::now();
            face.dirty = true;
        }
        face.candidates.clear();
        changed
    }

    /// Matches, disambiguates and promotes one photo's face group.
    /// Returns the number of changed records.
    pub fn reconcile_group(&self, group: &mut [FaceRecord]) -> Result<usize, RecognizeError> {
        if group.first().is_none_or(|f| f.is_no_face_sentinel()) {
            return Ok(0);
        }
        for face in group.iter_mut() {
            self.match_face(face)?;
        }
        disambiguate_group(group);
        let mut changed = 0;
        for face in group.iter_mut() {
            if self.assign_and_clear_candidates(face) {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Incremental run: reconciles every photo group of the collection and
    /// returns the ids of changed faces for the persistence boundary.
    pub fn run(&self, faces: &mut FaceCollection) -> Result<Vec<String>, RecognizeError> {
        let mut dirty = Vec::new();
        for group in faces.groups_mut() {
            self.reconcile_group(group)?;
            for f in group.iter().filter(|f| f.dirty) {
                dirty.push(f.id.clone());
            }
        }
        Ok(dirty)
    }

    /// Full run: every photo was re-detected from scratch in `fresh`.
    /// Labels curated in `previous` are carried onto the overlapping fresh
    /// regions first, then the collection is reconciled and the per-photo
    /// curated counts are audited against the previous snapshot.
    pub fn run_full(
        &self,
        previous: &mut FaceCollection,
        fresh: &mut FaceCollection,
    ) -> Result<Vec<String>, RecognizeError> {
        let old_counts = count_photo_faces(previous);

        for group in fresh.groups_mut() {
            let photo = group[0].photo_id().to_string();
            combine_existing_faces(group, previous.photo_faces_mut(&photo));
        }

        let dirty = self.run(fresh)?;

        let new_counts = count_photo_faces(fresh);
        audit_regressions(&old_counts, &new_counts);
        Ok(dirty)
    }
}

/// Resolves identity conflicts inside one photo's face group so that no
/// two faces end up claiming the same identity.
///
/// Faces are ranked by best candidate score (descending, ties by ascending
/// id; candidate-less faces last). From the second-ranked face down, while
/// the face's top candidate is already claimed by a higher-ranked face,
/// the top candidate is popped. When popping empties the list, or drops
/// the top score below [`RETENTION_RATIO`] of the face's original top
/// score, the face loses all candidates and goes unmatched for the run.
pub fn disambiguate_group(group: &mut [FaceRecord]) {
    if group.len() < 2 {
        return;
    }

    let mut order: Vec<usize> = (0..group.len()).collect();
    order.sort_by(|&a, &b| {
        let sa = group[a].best_candidate().map(|c| c.score);
        let sb = group[b].best_candidate().map(|c| c.score);
        match (sa, sb) {
            (Some(x), Some(y)) => y
                .partial_cmp(&x)
                .unwrap_or(Ordering::Equal)
                .then_with(|| group[a].id.cmp(&group[b].id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => group[a].id.cmp(&group[b].id),
        }
    });

    let mut claimed: Vec<IdentityId> = Vec::new();
    for (rank, &fi) in order.iter().enumerate() {
        let face = &mut group[fi];
        let Some(original) = face.best_candidate().map(|c| c.score) else {
            continue;
        };
        if rank > 0 {
            loop {
                let Some(top_id) = face.best_candidate().map(|c| c.identity) else {
                    break;
                };
                if !claimed.contains(&top_id) {
                    break;
                }
                face.candidates.remove(0);
                let holds_up = face
                    .best_candidate()
                    .is_some_and(|next| next.score >= RETENTION_RATIO * original);
                if !holds_up {
                    face.candidates.clear();
                    break;
                }
            }
        }
        if let Some(c) = face.best_candidate() {
            claimed.push(c.identity);
        }
    }
}

/// Carries curated identity state across a full re-detection.
///
/// For each fresh face, the most-overlapping previous face (70% of the
/// fresh region, see [`RelBox::find_most_overlapping`]) donates its
/// provenance, labels and update time. The donor is marked consumed so
/// completeness auditing does not report it as lost. Detector output is
/// not bit-stable across runs; this is how hand-curated labels survive.
pub fn combine_existing_faces(fresh: &mut [FaceRecord], previous: &mut [FaceRecord]) {
    if previous.is_empty() {
        return;
    }
    let boxes: Vec<RelBox> = previous.iter().map(|f| f.rect).collect();
    for face in fresh.iter_mut() {
        let Some(i) = face.rect.find_most_overlapping(&boxes) else {
            continue;
        };
        let donor = &mut previous[i];
        face.source = donor.source;
        face.names = donor.names.clone();
        face.updated_at = donor.updated_at;
        donor.mark_consumed();
    }
}

/// Per-photo counts of curated faces, used by the full-run regression
/// audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoFaceCounters {
    pub photo_id: String,
    /// Manual faces bound to a named identity.
    pub manual: u32,
    /// Manual faces of distinguished-but-unnamed people.
    pub unknown: u32,
    /// Corrected faces, named or not.
    pub corrected: u32,
}

impl PhotoFaceCounters {
    fn observe(&mut self, source: NameSource) {
        match source {
            NameSource::Manual { known: true } => self.manual += 1,
            NameSource::Manual { known: false } => self.unknown += 1,
            NameSource::Corrected { .. } => self.corrected += 1,
            _ => {}
        }
    }
}

/// Counts curated faces per photo. Output is sorted by photo id, one entry
/// per photo of the collection.
pub fn count_photo_faces(faces: &FaceCollection) -> Vec<PhotoFaceCounters> {
    let mut counts: Vec<PhotoFaceCounters> = Vec::new();
    for face in faces.iter() {
        let photo = face.photo_id();
        if counts.last().is_none_or(|last| last.photo_id != photo) {
            counts.push(PhotoFaceCounters { photo_id: photo.to_string(), ..Default::default() });
        }
        if let Some(last) = counts.last_mut() {
            last.observe(face.source);
        }
    }
    counts
}

/// Compares curated face counts photo by photo and logs one warning for
/// every photo that lost curated faces since the previous snapshot.
///
/// Advisory only: this reports, it never repairs. Returns the number of
/// regressed photos. Both inputs must be sorted by photo id, as
/// [`count_photo_faces`] produces them.
pub fn audit_regressions(old: &[PhotoFaceCounters], new: &[PhotoFaceCounters]) -> usize {
    let mut regressed = 0;
    let mut j = 0;
    for o in old {
        while j < new.len() && new[j].photo_id.as_str() < o.photo_id.as_str() {
            j += 1;
        }
        let (manual, unknown, corrected) = if j < new.len() && new[j].photo_id == o.photo_id {
            (new[j].manual, new[j].unknown, new[j].corrected)
        } else {
            (0, 0, 0)
        };
        if manual < o.manual || unknown < o.unknown || corrected < o.corrected {
            warn!(
                photo = %o.photo_id,
                manual = format!("{}->{manual}", o.manual),
                unknown = format!("{}->{unknown}", o.unknown),
                corrected = format!("{}->{corrected}", o.corrected),
                "photo lost curated faces since previous snapshot"
            );
            regressed += 1;
        }
    }
    regressed
}

/// Logs every assignment in the collection and warns on photos where two
/// faces claim the same identity. Diagnostic helper; read-only.
pub fn dump_assignments(faces: &FaceCollection) -> usize {
    let mut duplicates = 0;
    let mut photo = "";
    let mut seen: Vec<IdentityId> = Vec::new();
    for face in faces.iter() {
        if face.photo_id() != photo {
            photo = face.photo_id();
            seen.clear();
        }
        for name in &face.names {
            debug!(face = %face.id, identity = name.identity, source = %face.source, "assignment");
            if seen.contains(&name.identity) {
                warn!(photo = %photo, identity = name.identity, "duplicate identity assignment in photo");
                duplicates += 1;
            } else {
                seen.push(name.identity);
            }
        }
    }
    duplicates
}
