//! Repository trait and the persisted order shape.

use std::collections::BTreeMap;

use poslife_core::{CurrencyPair, OrderId, OrderSide, PositionId, Trade, TradeId};
use poslife_position::Position;
use serde::Serialize;

use crate::error::PersistenceResult;

/// An order as stored: an aggregation key for its trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub order_id: OrderId,
    pub currency_pair: CurrencyPair,
    pub side: OrderSide,
    trades: BTreeMap<TradeId, Trade>,
}

impl Order {
    pub fn new(order_id: OrderId, currency_pair: CurrencyPair, side: OrderSide) -> Self {
        Self {
            order_id,
            currency_pair,
            side,
            trades: BTreeMap::new(),
        }
    }

    /// Insert or replace a trade by trade ID.
    ///
    /// Returns `true` when the trade ID was not attached yet.
    pub fn upsert_trade(&mut self, trade: Trade) -> bool {
        self.trades.insert(trade.trade_id.clone(), trade).is_none()
    }

    pub fn remove_trade(&mut self, trade_id: &TradeId) -> Option<Trade> {
        self.trades.remove(trade_id)
    }

    /// Trades executed against this order, by trade ID.
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.values()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}

/// Durable storage for positions, orders and trades.
///
/// Implementations must not block the caller for long: both fluxes call
/// into the repository while holding a position lock. Failures are logged
/// by the caller and never retried.
pub trait PositionRepository: Send + Sync {
    /// Insert or replace a position, including its opening/closing orders.
    fn save_position(&self, position: &Position) -> PersistenceResult<()>;

    /// Insert or replace a trade by trade ID and attach it to its order.
    fn save_trade(&self, trade: &Trade) -> PersistenceResult<()>;

    fn find_order_by_id(&self, order_id: &OrderId) -> PersistenceResult<Option<Order>>;

    fn find_position_by_id(&self, id: PositionId) -> PersistenceResult<Option<Position>>;

    fn position_count(&self) -> PersistenceResult<usize>;

    fn trade_count(&self) -> PersistenceResult<usize>;
}
