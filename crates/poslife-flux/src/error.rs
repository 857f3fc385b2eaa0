//! Flux and service error types.

use poslife_core::PositionId;
use poslife_persistence::PersistenceError;
use poslife_position::PositionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FluxError {
    #[error("Position not found: {0}")]
    PositionNotFound(PositionId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Position error: {0}")]
    Position(#[from] PositionError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("{0} flux queue is full")]
    QueueFull(&'static str),

    #[error("{0} flux is stopped")]
    Stopped(&'static str),

    #[error("Flux task failed: {0}")]
    TaskFailed(String),
}

pub type FluxResult<T> = Result<T, FluxError>;
