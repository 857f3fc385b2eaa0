//! JSON-lines commands fed to the engine.
//!
//! One JSON object per line, discriminated by `kind`:
//!
//! ```text
//! {"kind":"open_position","currency_pair":"ETH/BTC","amount":"10","stop_gain_percentage":"1000"}
//! {"kind":"close_position","position_id":1}
//! {"kind":"ticker","currency_pair":"ETH/BTC","last":"0.18"}
//! {"kind":"trade","trade_id":"1","order_id":"ORDER00001","side":"buy","currency_pair":"ETH/BTC","amount":"10","price":"0.03"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use poslife_core::{Amount, CurrencyPair, PositionId, StrategyRef, Ticker, Trade};
use poslife_position::PositionRules;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    OpenPosition(OpenPosition),
    ClosePosition { position_id: u64 },
    Ticker(Ticker),
    Trade(Trade),
}

/// Position request from a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenPosition {
    #[serde(default = "default_strategy_id")]
    pub strategy_id: u64,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    pub currency_pair: CurrencyPair,
    pub amount: Amount,
    #[serde(default)]
    pub stop_gain_percentage: Option<Decimal>,
    #[serde(default)]
    pub stop_loss_percentage: Option<Decimal>,
}

fn default_strategy_id() -> u64 {
    1
}

fn default_strategy() -> String {
    "01".to_string()
}

impl OpenPosition {
    pub fn strategy_ref(&self) -> StrategyRef {
        StrategyRef::new(self.strategy_id, self.strategy.clone())
    }

    pub fn rules(&self) -> PositionRules {
        let mut builder = PositionRules::builder();
        if let Some(gain) = self.stop_gain_percentage {
            builder = builder.stop_gain_percentage(gain);
        }
        if let Some(loss) = self.stop_loss_percentage {
            builder = builder.stop_loss_percentage(loss);
        }
        builder.build()
    }
}

impl Command {
    /// Parse one input line; `None` for blank and comment lines.
    pub fn parse_line(line_no: usize, line: &str) -> AppResult<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        serde_json::from_str(line)
            .map(Some)
            .map_err(|e| AppError::Command {
                line: line_no,
                message: e.to_string(),
            })
    }

    /// Label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OpenPosition(_) => "open_position",
            Self::ClosePosition { .. } => "close_position",
            Self::Ticker(_) => "ticker",
            Self::Trade(_) => "trade",
        }
    }

    pub fn close_target(&self) -> Option<PositionId> {
        match self {
            Self::ClosePosition { position_id } => Some(PositionId(*position_id)),
            _ => None,
        }
    }
}
