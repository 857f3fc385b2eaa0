//! In-process repository backed by DashMap.

use dashmap::DashMap;
use poslife_core::{OrderId, PositionId, Trade, TradeId};
use poslife_position::Position;
use tracing::trace;

use crate::error::{PersistenceError, PersistenceResult};
use crate::repository::{Order, PositionRepository};

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    positions: DashMap<PositionId, Position>,
    orders: DashMap<OrderId, Order>,
    trades: DashMap<TradeId, Trade>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_order(&self, order: Order) {
        self.orders.entry(order.order_id.clone()).or_insert(order);
    }
}

impl PositionRepository for InMemoryRepository {
    fn save_position(&self, position: &Position) -> PersistenceResult<()> {
        let side = position.direction();
        self.ensure_order(Order::new(
            position.opening_order_id().clone(),
            position.currency_pair.clone(),
            side,
        ));
        if let Some(closing) = position.closing_order_id() {
            self.ensure_order(Order::new(
                closing.clone(),
                position.currency_pair.clone(),
                side.opposite(),
            ));
        }

        trace!(position_id = %position.id, status = %position.status(), "Position saved");
        self.positions.insert(position.id, position.clone());
        Ok(())
    }

    fn save_trade(&self, trade: &Trade) -> PersistenceResult<()> {
        if let Some(order) = self.orders.get(&trade.order_id) {
            if order.currency_pair != trade.currency_pair {
                return Err(PersistenceError::Conflict(format!(
                    "trade {} is {} but order {} is {}",
                    trade.trade_id, trade.currency_pair, order.order_id, order.currency_pair
                )));
            }
        }

        let previous = self.trades.insert(trade.trade_id.clone(), trade.clone());
        if let Some(previous) = previous.filter(|p| p.order_id != trade.order_id) {
            if let Some(mut old_order) = self.orders.get_mut(&previous.order_id) {
                old_order.remove_trade(&trade.trade_id);
            }
        }

        self.orders
            .entry(trade.order_id.clone())
            .or_insert_with(|| {
                Order::new(
                    trade.order_id.clone(),
                    trade.currency_pair.clone(),
                    trade.side,
                )
            })
            .upsert_trade(trade.clone());

        trace!(trade_id = %trade.trade_id, order_id = %trade.order_id, "Trade saved");
        Ok(())
    }

    fn find_order_by_id(&self, order_id: &OrderId) -> PersistenceResult<Option<Order>> {
        Ok(self.orders.get(order_id).map(|r| r.value().clone()))
    }

    fn find_position_by_id(&self, id: PositionId) -> PersistenceResult<Option<Position>> {
        Ok(self.positions.get(&id).map(|r| r.value().clone()))
    }

    fn position_count(&self) -> PersistenceResult<usize> {
        Ok(self.positions.len())
    }

    fn trade_count(&self) -> PersistenceResult<usize> {
        Ok(self.trades.len())
    }
}
