//! Position lifecycle engine application.
//!
//! Reads JSON-lines commands (position requests, close requests, tickers,
//! trades) from a file or stdin and drives the poslife engine with them:
//! - TOML configuration with serde defaults
//! - In-memory persistence
//! - Position notifications reported through `tracing`

pub mod app;
pub mod command;
pub mod config;
pub mod error;
pub mod listener;

pub use app::{Application, RunSummary};
pub use command::Command;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use listener::LoggingListener;
