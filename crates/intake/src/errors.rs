use thiserror::Error;

/// Errors raised by the form engine itself.
///
/// Dispatch failures have their own type (`dispatch::DispatchError`) because
/// they never escape the submission pipeline.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("schema error: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("invalid field id {id:?} under {parent:?}: {reason}")]
    InvalidFieldId {
        parent: String,
        id: String,
        reason: &'static str,
    },

    #[error("invalid field path: {0:?}")]
    InvalidPath(String),
}

pub type Result<T, E = IntakeError> = std::result::Result<T, E>;
