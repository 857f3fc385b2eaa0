//! Stop-gain / stop-loss rules and their evaluation.
//!
//! # Evaluation
//!
//! - Gain (long): `(latest - entry) / entry * 100`
//! - Gain (short): `(entry - latest) / entry * 100`
//! - Stop gain fires when set and `gain >= stop_gain_percentage`
//! - Stop loss fires when set and `-gain >= stop_loss_percentage`
//!
//! Only OPENED positions are evaluated. Once a position is CLOSING the
//! evaluator returns [`CloseDecision::Hold`], so a sustained breach closes
//! it exactly once.

use poslife_core::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::position::Position;
use crate::status::PositionStatus;

/// Thresholds that close a position automatically.
///
/// An unset threshold never triggers; a position with no thresholds is
/// valid and only closes on explicit request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRules {
    #[serde(default)]
    stop_gain_percentage: Option<Decimal>,
    #[serde(default)]
    stop_loss_percentage: Option<Decimal>,
}

impl PositionRules {
    pub fn builder() -> PositionRulesBuilder {
        PositionRulesBuilder::default()
    }

    pub fn stop_gain_percentage(&self) -> Option<Decimal> {
        self.stop_gain_percentage
    }

    pub fn stop_loss_percentage(&self) -> Option<Decimal> {
        self.stop_loss_percentage
    }

    pub fn is_stop_gain_set(&self) -> bool {
        self.stop_gain_percentage.is_some()
    }

    pub fn is_stop_loss_set(&self) -> bool {
        self.stop_loss_percentage.is_some()
    }
}

impl fmt::Display for PositionRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.stop_gain_percentage, self.stop_loss_percentage) {
            (None, None) => write!(f, "no rules"),
            (Some(gain), None) => write!(f, "stop gain {gain}%"),
            (None, Some(loss)) => write!(f, "stop loss {loss}%"),
            (Some(gain), Some(loss)) => write!(f, "stop gain {gain}% / stop loss {loss}%"),
        }
    }
}

#[derive(Debug, Default)]
pub struct PositionRulesBuilder {
    stop_gain_percentage: Option<Decimal>,
    stop_loss_percentage: Option<Decimal>,
}

impl PositionRulesBuilder {
    #[must_use]
    pub fn stop_gain_percentage(mut self, percentage: Decimal) -> Self {
        self.stop_gain_percentage = Some(percentage);
        self
    }

    #[must_use]
    pub fn stop_loss_percentage(mut self, percentage: Decimal) -> Self {
        self.stop_loss_percentage = Some(percentage);
        self
    }

    pub fn build(self) -> PositionRules {
        PositionRules {
            stop_gain_percentage: self.stop_gain_percentage,
            stop_loss_percentage: self.stop_loss_percentage,
        }
    }
}

/// Outcome of evaluating a position against its rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// No threshold breached.
    Hold,
    /// Gain reached the stop-gain threshold.
    StopGain {
        /// Gain at the evaluated price.
        gain_percentage: Decimal,
    },
    /// Loss reached the stop-loss threshold.
    StopLoss {
        /// Loss at the evaluated price (positive number).
        loss_percentage: Decimal,
    },
}

impl CloseDecision {
    pub fn should_close(&self) -> bool {
        !matches!(self, Self::Hold)
    }
}

impl fmt::Display for CloseDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hold => write!(f, "Hold"),
            Self::StopGain { gain_percentage } => write!(f, "StopGain({gain_percentage}%)"),
            Self::StopLoss { loss_percentage } => write!(f, "StopLoss({loss_percentage}%)"),
        }
    }
}

/// Decide whether `position` must close at `latest`.
pub fn evaluate(position: &Position, latest: Price) -> CloseDecision {
    if position.status() != PositionStatus::Opened {
        return CloseDecision::Hold;
    }

    let Some(gain) = position.gain_percentage_at(latest) else {
        return CloseDecision::Hold;
    };

    if let Some(threshold) = position.rules.stop_gain_percentage {
        if gain >= threshold {
            return CloseDecision::StopGain {
                gain_percentage: gain,
            };
        }
    }

    if let Some(threshold) = position.rules.stop_loss_percentage {
        let loss = -gain;
        if loss >= threshold {
            return CloseDecision::StopLoss {
                loss_percentage: loss,
            };
        }
    }

    CloseDecision::Hold
}
