//! Position error types.

use poslife_core::PositionId;
use thiserror::Error;

use crate::status::PositionStatus;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Position not found: {0}")]
    NotFound(PositionId),

    #[error("Invalid transition for position {id}: {from} -> {to}")]
    InvalidTransition {
        id: PositionId,
        from: PositionStatus,
        to: PositionStatus,
    },

    #[error("Invalid position state: {0}")]
    InvalidState(String),
}

pub type PositionResult<T> = Result<T, PositionError>;
