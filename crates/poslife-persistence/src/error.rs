//! Persistence error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Record conflict: {0}")]
    Conflict(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
