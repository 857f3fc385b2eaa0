//! Error types for poslife-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Invalid currency pair: {0}")]
    InvalidCurrencyPair(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
