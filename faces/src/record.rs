use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FaceError;
use crate::geometry::RelBox;
use crate::namesource::NameSource;

/// Identity identifier. Non-negative ids refer to named people; strictly
/// negative ids are synthetic placeholders for "same unnamed person seen
/// again" and never collide with named ids.
pub type IdentityId = i64;

/// Separator between photo id and face index inside a face id.
pub const ID_SEP: char = '~';

/// Builds the face id for the `index`-th face of a photo.
pub fn face_id(photo_id: &str, index: u32) -> String {
    format!("{photo_id}{ID_SEP}{index}")
}

/// Splits a face id into its photo id and face index.
pub fn split_face_id(id: &str) -> Result<(&str, u32), FaceError> {
    let bad = || FaceError::BadFaceId { id: id.to_string() };
    let (photo, index) = id.rsplit_once(ID_SEP).ok_or_else(bad)?;
    if photo.is_empty() {
        return Err(bad());
    }
    let index = index.parse().map_err(|_| bad())?;
    Ok((photo, index))
}

/// One identity assigned to a face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceName {
    /// Identity the face is bound to.
    #[serde(rename = "id")]
    pub identity: IdentityId,

    /// Match score at assignment time. 1.0 for manual assignments.
    #[serde(rename = "score")]
    pub score: f32,

    /// Human-readable factor breakdown of the score.
    #[serde(rename = "explain", default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,

    /// Cached display name, resolved when the label was written.
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A candidate identity produced by the matcher for one face.
/// Run-scoped: cleared after promotion or discard, never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub identity: IdentityId,
    pub score: f32,
    /// Factor breakdown; filled for the best candidate only.
    pub explain: String,
    /// Provenance of the matched reference face. Its known flag survives
    /// into the promoted label.
    pub source: NameSource,
}

/// One detected face region within one photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecord {
    /// `"<photoId>~<index>"`, index 0-based and contiguous per photo.
    /// Index 0 with `face_count` 0 is the "photo scanned, no face found"
    /// sentinel.
    #[serde(rename = "id")]
    pub id: String,

    /// Number of faces detected in the same photo; shared by all of the
    /// photo's records.
    #[serde(rename = "faces")]
    pub face_count: u32,

    /// Embedding vector. `None` means the vector was never produced.
    /// `Some` with an empty vec marks a reference face already consumed by
    /// full-run continuity, which must not be reported missing.
    #[serde(rename = "embedding", default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Face region relative to the photo.
    #[serde(rename = "rect", default)]
    pub rect: RelBox,

    /// Extracted crop size in pixels.
    #[serde(rename = "w0", default)]
    pub width: u32,
    #[serde(rename = "h0", default)]
    pub height: u32,

    /// Rotation applied before cropping, degrees.
    #[serde(rename = "rotate", default)]
    pub rotate: i32,

    /// Detector pose angle heuristic.
    #[serde(rename = "angle", default)]
    pub face_angle: f32,

    /// Frontal/profile ratio heuristic; 1.0 is frontal.
    #[serde(rename = "ratio", default)]
    pub face_ratio: f32,

    /// Detector quality flag.
    #[serde(rename = "ok", default)]
    pub face_ok: bool,

    /// Key into the external embedding blob store. Opaque here.
    #[serde(rename = "blob", default)]
    pub blob_id: i64,

    /// How the current labels were established.
    #[serde(rename = "source", default)]
    pub source: NameSource,

    /// Assigned identities, best first. At most one is used in practice.
    #[serde(rename = "names", default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<FaceName>,

    /// Candidate identities for the current run. Transient.
    #[serde(skip)]
    pub candidates: Vec<Candidate>,

    /// Last time labels or provenance changed.
    #[serde(rename = "updated", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    /// True when the record differs from its persisted form. Transient.
    #[serde(skip)]
    pub dirty: bool,
}

impl FaceRecord {
    /// A fresh unlabeled record for the `index`-th face of a photo.
    pub fn new(photo_id: &str, index: u32, face_count: u32) -> Self {
        Self {
            id: face_id(photo_id, index),
            face_count,
            embedding: None,
            rect: RelBox::default(),
            width: 0,
            height: 0,
            rotate: 0,
            face_angle: 0.0,
            face_ratio: 0.0,
            face_ok: false,
            blob_id: 0,
            source: NameSource::NotAssigned,
            names: Vec::new(),
            candidates: Vec::new(),
            updated_at: Utc::now(),
            dirty: false,
        }
    }

    /// The photo this face belongs to. Falls back to the whole id when the
    /// separator is absent.
    pub fn photo_id(&self) -> &str {
        self.id.rsplit_once(ID_SEP).map_or(self.id.as_str(), |(p, _)| p)
    }

    /// True for the "photo scanned, no face found" sentinel record.
    pub fn is_no_face_sentinel(&self) -> bool {
        self.face_count == 0
    }

    /// True when a usable (non-empty) embedding is present.
    pub fn has_embedding(&self) -> bool {
        matches!(&self.embedding, Some(v) if !v.is_empty())
    }

    /// True when no embedding was ever produced for this face.
    /// Consumed reference faces return false.
    pub fn embedding_missing(&self) -> bool {
        self.embedding.is_none()
    }

    /// Marks a reference face as consumed by full-run continuity so that
    /// completeness auditing does not flag it as lost.
    pub fn mark_consumed(&mut self) {
        self.embedding = Some(Vec::new());
    }

    /// Best candidate of the current run, if any.
    pub fn best_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Compares the assigned labels against a candidate list by identity
    /// and score. Used to decide whether a promotion actually changes the
    /// record.
    pub fn names_match(&self, candidates: &[Candidate]) -> bool {
        self.names.len() == candidates.len()
            && self
                .names
                .iter()
                .zip(candidates)
                .all(|(n, c)| n.identity == c.identity && n.score == c.score)
    }
}
