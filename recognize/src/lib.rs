//! Face-identity matching, disambiguation and reconciliation.
//!
//! # Pipeline
//!
//! 1. [`TargetFaceIndex::build`]: labeled reference faces -> searchable
//!    per-identity index
//! 2. [`MatchReconciler::match_face`]: subject face -> up to 3 candidate
//!    identities via [`FaceScorer`]
//! 3. [`disambiguate_group`]: one photo's faces -> conflict-free candidates
//! 4. [`MatchReconciler::assign_and_clear_candidates`]: candidates ->
//!    promoted labels with provenance
//!
//! Incremental runs ([`MatchReconciler::run`]) touch only the faces handed
//! in and leave manually-defined faces alone. Full runs
//! ([`MatchReconciler::run_full`]) first carry curated labels from the
//! previous snapshot onto the re-detected regions by geometric overlap,
//! then match, then audit per-photo curated counts for regressions.
//!
//! The engine is single-threaded and synchronous: photos are processed in
//! ordinal id order one group at a time, because disambiguation needs all
//! of a photo's candidates at once. The built index and scorer are
//! read-only and could be shared across threads; the unit of any future
//! parallelism must stay "one photo's face group".

pub mod config;
pub mod error;
pub mod reconcile;
pub mod scorer;
pub mod targets;

pub use config::MatchConfig;
pub use error::RecognizeError;
pub use reconcile::{
    MatchReconciler, NameLookup, NoNames, PhotoFaceCounters, RETENTION_RATIO, audit_regressions,
    combine_existing_faces, count_photo_faces, disambiguate_group, dump_assignments,
};
pub use scorer::{FaceScorer, height_score, ratio_score};
pub use targets::{COARSE_CUTOFF, Hit, MAX_CANDIDATES, TargetFace, TargetFaceIndex, UnknownIdAlloc};

#[cfg(test)]
mod tests;
