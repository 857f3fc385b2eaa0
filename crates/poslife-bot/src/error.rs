//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command on line {line}: {message}")]
    Command { line: usize, message: String },

    #[error("Engine error: {0}")]
    Flux(#[from] poslife_flux::FluxError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] poslife_telemetry::TelemetryError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] poslife_persistence::PersistenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
