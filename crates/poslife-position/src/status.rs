//! Position lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a position.
///
/// Ordered: a position only ever moves to the next variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    /// Opening order created, waiting for its trades.
    Opening,
    /// Opening trades cover the requested amount.
    Opened,
    /// Closing order created, waiting for its trades.
    Closing,
    /// Closing trades cover the opened amount. Terminal.
    Closed,
}

impl PositionStatus {
    /// Whether `next` is the single legal successor of this state.
    pub fn can_transition_to(&self, next: PositionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Opening, Self::Opened)
                | (Self::Opened, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }

    /// Whether tickers move the price extremes in this state.
    pub fn tracks_prices(&self) -> bool {
        matches!(self, Self::Opened | Self::Closing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "OPENING",
            Self::Opened => "OPENED",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
