use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckpointError>;

#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Addressed checkpoint id does not exist for the thread
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend itself failed; the stored log is unchanged
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid checkpoint: {0}")]
    Invalid(String),

    /// Every read and write is scoped to a thread
    #[error("Checkpoint config has no thread_id")]
    MissingThreadId,
}

impl CheckpointError {
    /// Whether retrying the same call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, CheckpointError::Storage(_))
    }
}
