use thiserror::Error;

use crate::llm::LlmError;

/// Errors from memory update and retrieval operations.
///
/// Only `MissingSession` and `SessionClosed` indicate a wiring defect and
/// propagate to the caller; everything else is degraded-recall territory and
/// is logged and absorbed by the service layer.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("no session context for '{0}'")]
    MissingSession(String),

    #[error("session '{0}' is closed")]
    SessionClosed(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("embedding failure: {0}")]
    Embedding(String),
}

/// Errors from the snapshot store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(String),

    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}
