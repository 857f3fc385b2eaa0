//! Prometheus metrics and structured logging for poslife.
//!
//! - Structured logging with `tracing` (JSON in production, pretty otherwise)
//! - Prometheus counters for ingested events, drops and status transitions

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
