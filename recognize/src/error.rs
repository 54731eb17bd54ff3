use thiserror::Error;

/// Errors returned by matching operations.
#[derive(Debug, Error)]
pub enum RecognizeError {
    /// A matchable face arrived without its embedding. This means the
    /// upstream detection/embedding pipeline is corrupt; the run must not
    /// continue for this unit.
    #[error("face {face_id} has no embedding at match time")]
    MissingEmbedding { face_id: String },

    /// A reference face flagged known carries no label to take the
    /// identity from.
    #[error("target face {face_id} is known but has no label")]
    TargetWithoutLabel { face_id: String },
}
