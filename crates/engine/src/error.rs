use flexdata_core::CoreError;
use flexdata_storage::StorageError;
use thiserror::Error;

/// Local validation failure. Raised before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("submission has no values")]
    EmptySubmission,

    #[error("{0} name must not be blank")]
    BlankName(&'static str),
}

/// A create, update or delete rejected by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteWriteError {
    pub message: String,
    pub code: Option<String>,
}

impl From<StorageError> for RemoteWriteError {
    fn from(err: StorageError) -> Self {
        Self {
            code: Some(err.code().to_string()),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("remote write failed: {0}")]
    RemoteWrite(#[from] RemoteWriteError),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("no collection selected")]
    NoCollectionSelected,

    #[error("confirmation does not match collection name {expected:?}")]
    ConfirmationMismatch { expected: String },

    #[error("no drag in progress")]
    NoActiveDrag,
}
