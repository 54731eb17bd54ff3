use thiserror::Error;

/// Errors returned by face model operations.
#[derive(Debug, Error)]
pub enum FaceError {
    #[error("malformed face id {id:?}: expected \"<photoId>~<index>\"")]
    BadFaceId { id: String },

    #[error("unknown name source {value:?}")]
    BadNameSource { value: String },

    #[error("malformed relative box {value:?}: expected \"x,y,w,h\"")]
    BadRelBox { value: String },
}
