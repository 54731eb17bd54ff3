//! Face record model for the photark matching engine.
//!
//! A [`FaceRecord`] is one detected face region within one photo, identified
//! by `"<photoId>~<index>"`. Records arrive from an external detector and
//! embedder, are enriched by the matcher (provenance, name labels), and are
//! persisted between runs. This crate holds the value types and the
//! invariant-preserving helpers; all matching behavior lives in
//! `photark-recognize`.
//!
//! # Ordinal ordering
//!
//! A [`FaceCollection`] keeps its records sorted by byte-wise (ordinal)
//! comparison of the id string. Faces of one photo then occupy a contiguous
//! block, which the matcher exploits for per-photo grouping. Photo ids must
//! not contain the `~` separator.

pub mod collection;
pub mod error;
pub mod geometry;
pub mod namesource;
pub mod record;

pub use collection::FaceCollection;
pub use error::FaceError;
pub use geometry::RelBox;
pub use namesource::NameSource;
pub use record::{Candidate, FaceName, FaceRecord, IdentityId, face_id, split_face_id};
