//! Position state machine.
//!
//! ```text
//! OPENING ──(opening trades == amount)──▶ OPENED
//! OPENED  ──(stop rule / close request)──▶ CLOSING   (closing order attached)
//! CLOSING ──(closing trades == opened)──▶ CLOSED    (terminal)
//! ```
//!
//! Trades are routed by owning order ID: the opening order feeds opening
//! trades while the position is OPENING or OPENED, the closing order feeds
//! closing trades while it is CLOSING. Anything else is rejected without
//! touching the position.

use poslife_core::{OrderId, Trade};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{PositionError, PositionResult};
use crate::position::Position;
use crate::status::PositionStatus;

/// Why a trade was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Position is CLOSED.
    Terminal,
    /// Trade's order is neither the opening nor the closing order.
    OrderMismatch,
    /// Order matches, but the position is not in a state accepting it.
    StateMismatch,
}

impl Rejection {
    /// Label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::OrderMismatch => "unroutable",
            Self::StateMismatch => "state_mismatch",
        }
    }
}

/// Result of applying a trade to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOutcome {
    Applied {
        /// `false` when an entry with the same trade ID was replaced.
        inserted: bool,
        /// Status reached because of this trade, if any.
        transitioned_to: Option<PositionStatus>,
    },
    Rejected(Rejection),
}

impl TradeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn transitioned_to(&self) -> Option<PositionStatus> {
        match self {
            Self::Applied {
                transitioned_to, ..
            } => *transitioned_to,
            Self::Rejected(_) => None,
        }
    }
}

impl Position {
    /// Move to `next`, which must be the immediate successor.
    pub fn transition(&mut self, next: PositionStatus) -> PositionResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(PositionError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        info!(
            position_id = %self.id,
            from = %self.status,
            to = %next,
            "Position status changed"
        );
        self.status = next;
        Ok(())
    }

    /// Move an OPENED position to CLOSING with a freshly synthesized order.
    pub fn begin_closing(&mut self, closing_order_id: OrderId) -> PositionResult<()> {
        self.transition(PositionStatus::Closing)?;
        self.closing_order_id = Some(closing_order_id);
        Ok(())
    }

    /// Whether a trade on `order_id` would be accepted right now.
    pub fn accepts_order(&self, order_id: &OrderId) -> bool {
        match self.status {
            PositionStatus::Opening | PositionStatus::Opened => {
                &self.opening_order_id == order_id
            }
            PositionStatus::Closing => self.closing_order_id.as_ref() == Some(order_id),
            PositionStatus::Closed => false,
        }
    }

    /// Apply a (possibly re-delivered) trade.
    ///
    /// Amounts are compared within `tolerance` when checking whether the
    /// opening or closing order is complete.
    pub fn apply_trade(&mut self, trade: Trade, tolerance: Decimal) -> TradeOutcome {
        if self.status.is_terminal() {
            return TradeOutcome::Rejected(Rejection::Terminal);
        }

        let is_opening = trade.order_id == self.opening_order_id;
        let is_closing = self.closing_order_id.as_ref() == Some(&trade.order_id);
        if !is_opening && !is_closing {
            return TradeOutcome::Rejected(Rejection::OrderMismatch);
        }
        if !self.accepts_order(&trade.order_id) {
            debug!(
                position_id = %self.id,
                status = %self.status,
                trade_id = %trade.trade_id,
                order_id = %trade.order_id,
                "Trade order does not match position state"
            );
            return TradeOutcome::Rejected(Rejection::StateMismatch);
        }

        if is_opening {
            let inserted = upsert(&mut self.opening_trades, trade);
            let transitioned_to = (self.status == PositionStatus::Opening
                && self.opened_amount().matches(self.amount, tolerance))
            .then_some(PositionStatus::Opened);
            self.finish(inserted, transitioned_to)
        } else {
            let inserted = upsert(&mut self.closing_trades, trade);
            let transitioned_to = self
                .closed_amount()
                .matches(self.opened_amount(), tolerance)
                .then_some(PositionStatus::Closed);
            self.finish(inserted, transitioned_to)
        }
    }

    fn finish(&mut self, inserted: bool, transitioned_to: Option<PositionStatus>) -> TradeOutcome {
        if let Some(next) = transitioned_to {
            // Guarded above: Opening -> Opened and Closing -> Closed only
            if self.transition(next).is_err() {
                return TradeOutcome::Applied {
                    inserted,
                    transitioned_to: None,
                };
            }
        }
        TradeOutcome::Applied {
            inserted,
            transitioned_to,
        }
    }
}

/// Insert or replace by trade ID, keeping ascending timestamp order.
fn upsert(trades: &mut Vec<Trade>, trade: Trade) -> bool {
    let inserted = match trades.iter_mut().find(|t| t.trade_id == trade.trade_id) {
        Some(existing) => {
            let arrival = existing.arrival;
            *existing = trade;
            if existing.arrival.is_none() {
                existing.arrival = arrival;
            }
            false
        }
        None => {
            trades.push(trade);
            true
        }
    };
    trades.sort_by_key(Trade::ordering_key);
    inserted
}
