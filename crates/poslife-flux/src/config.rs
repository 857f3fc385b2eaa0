//! Engine configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FluxError, FluxResult};

/// Library-side settings for [`crate::Engine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Largest difference at which filled and requested amounts match.
    #[serde(default)]
    pub amount_tolerance: Decimal,

    /// Ticker flux channel capacity.
    #[serde(default = "default_capacity")]
    pub ticker_capacity: usize,

    /// Trade flux channel capacity.
    #[serde(default = "default_capacity")]
    pub trade_capacity: usize,
}

fn default_capacity() -> usize {
    1024
}

impl EngineConfig {
    /// Reject settings the engine cannot start with.
    pub fn validate(&self) -> FluxResult<()> {
        if self.amount_tolerance.is_sign_negative() {
            return Err(FluxError::InvalidRequest(format!(
                "amount_tolerance must not be negative, got {}",
                self.amount_tolerance
            )));
        }
        if self.ticker_capacity == 0 || self.trade_capacity == 0 {
            return Err(FluxError::InvalidRequest(
                "flux capacities must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: Decimal::ZERO,
            ticker_capacity: default_capacity(),
            trade_capacity: default_capacity(),
        }
    }
}
