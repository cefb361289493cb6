//! Error taxonomy shared by the service, store, and API layers.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TaskError {
    /// Missing or invalid field in a request (maps to 400).
    #[error("{0}")]
    Validation(String),

    /// Unknown task id (maps to 404).
    #[error("Task {0} not found")]
    NotFound(Uuid),

    /// Underlying store failure (maps to 500, logged, generic message).
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Failed to encode/decode a JSON column (tags, notes).
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Filesystem failure while opening the store (maps to 500).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TaskResult<T> = Result<T, TaskError>;
