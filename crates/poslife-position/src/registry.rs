//! Registry of live positions.
//!
//! Every position lives behind its own `parking_lot::Mutex`: the ticker
//! flux and the trade flux may address the same position concurrently, and
//! the mutex is what makes each event's application atomic for it.
//!
//! Two routing indexes sit next to the positions:
//! - order ID → position ID, used by the trade flux
//! - currency pair → position IDs, used by the ticker flux (CLOSED
//!   positions are released from it)
//!
//! # Locking
//!
//! DashMap guards are never held while waiting on a position mutex: lookups
//! clone the `Arc` out first. Index updates may happen while a position
//! mutex is held.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use poslife_core::{CurrencyPair, OrderId, PositionId};
use tracing::{debug, trace};

use crate::position::Position;

/// A position behind its exclusive-access boundary.
pub type SharedPosition = Arc<Mutex<Position>>;

#[derive(Debug)]
pub struct PositionRegistry {
    positions: DashMap<PositionId, SharedPosition>,
    by_order: DashMap<OrderId, PositionId>,
    by_pair: DashMap<CurrencyPair, BTreeSet<PositionId>>,
    next_id: AtomicU64,
}

impl Default for PositionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Registry whose first assigned ID is `first_id`.
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            positions: DashMap::new(),
            by_order: DashMap::new(),
            by_pair: DashMap::new(),
            next_id: AtomicU64::new(first_id),
        }
    }

    /// Reserve the next position ID.
    pub fn next_position_id(&self) -> PositionId {
        PositionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a position and index its orders and pair.
    pub fn insert(&self, position: Position) -> SharedPosition {
        self.insert_with(position, |_| ()).0
    }

    /// Register a position and run `f` on it before anyone else can lock it.
    ///
    /// The position is locked before it becomes reachable through any
    /// index, so events routed to it wait until `f` returns.
    pub fn insert_with<R>(
        &self,
        position: Position,
        f: impl FnOnce(&mut Position) -> R,
    ) -> (SharedPosition, R) {
        let id = position.id;
        let shared = Arc::new(Mutex::new(position));

        let result = {
            let mut guard = shared.lock();
            self.by_order.insert(guard.opening_order_id().clone(), id);
            if let Some(closing) = guard.closing_order_id() {
                self.by_order.insert(closing.clone(), id);
            }
            if !guard.status().is_terminal() {
                self.by_pair
                    .entry(guard.currency_pair.clone())
                    .or_default()
                    .insert(id);
            }
            self.positions.insert(id, Arc::clone(&shared));
            debug!(position_id = %id, "Position registered");

            f(&mut guard)
        };

        (shared, result)
    }

    pub fn get(&self, id: PositionId) -> Option<SharedPosition> {
        self.positions.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Route an order ID to its position.
    pub fn find_by_order(&self, order_id: &OrderId) -> Option<SharedPosition> {
        let id = *self.by_order.get(order_id)?;
        self.get(id)
    }

    /// Make trades on `order_id` route to position `id`.
    pub fn register_order(&self, order_id: OrderId, id: PositionId) {
        trace!(order_id = %order_id, position_id = %id, "Order routed");
        self.by_order.insert(order_id, id);
    }

    /// Non-terminal positions on `pair`, ascending by ID.
    pub fn positions_on(&self, pair: &CurrencyPair) -> Vec<SharedPosition> {
        let ids: Vec<PositionId> = match self.by_pair.get(pair) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Vec::new(),
        };
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// Stop routing tickers of `pair` to position `id`.
    pub fn release_pair(&self, pair: &CurrencyPair, id: PositionId) {
        let now_empty = match self.by_pair.get_mut(pair) {
            Some(mut ids) => {
                ids.remove(&id);
                ids.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_pair.remove_if(pair, |_, ids| ids.is_empty());
        }
    }

    /// Copy of a position's current state.
    pub fn snapshot(&self, id: PositionId) -> Option<Position> {
        self.get(id).map(|p| p.lock().clone())
    }

    /// Copies of every position, ascending by ID.
    pub fn snapshots(&self) -> Vec<Position> {
        let mut shared: Vec<(PositionId, SharedPosition)> = self
            .positions
            .iter()
            .map(|r| (*r.key(), Arc::clone(r.value())))
            .collect();
        shared.sort_by_key(|(id, _)| *id);
        shared.into_iter().map(|(_, p)| p.lock().clone()).collect()
    }

    /// Number of positions ever registered.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of positions still receiving tickers.
    pub fn open_count(&self) -> usize {
        self.by_pair.iter().map(|r| r.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::PositionRules;
    use crate::status::PositionStatus;
    use poslife_core::{Amount, StrategyRef};
    use rust_decimal_macros::dec;

    fn pair(s: &str) -> CurrencyPair {
        s.parse().unwrap()
    }

    fn new_position(registry: &PositionRegistry, p: &str, order: &str) -> Position {
        Position::new(
            registry.next_position_id(),
            pair(p),
            Amount::new(dec!(1)),
            PositionRules::default(),
            OrderId::from(order),
            StrategyRef::new(1, "01"),
        )
    }

    #[test]
    fn test_ids_are_monotonic_from_one() {
        let registry = PositionRegistry::new();
        assert_eq!(registry.next_position_id(), PositionId(1));
        assert_eq!(registry.next_position_id(), PositionId(2));
    }

    #[test]
    fn test_route_by_order() {
        let registry = PositionRegistry::new();
        let p1 = new_position(&registry, "ETH/BTC", "ORDER00010");
        let p2 = new_position(&registry, "ETH/BTC", "ORDER00020");
        registry.insert(p1);
        registry.insert(p2);

        let found = registry.find_by_order(&OrderId::from("ORDER00020")).unwrap();
        assert_eq!(found.lock().id, PositionId(2));
        assert!(registry.find_by_order(&OrderId::from("UNKNOWN")).is_none());

        registry.register_order(OrderId::from("ORDER00011"), PositionId(1));
        let found = registry.find_by_order(&OrderId::from("ORDER00011")).unwrap();
        assert_eq!(found.lock().id, PositionId(1));
    }

    #[test]
    fn test_positions_on_pair_and_release() {
        let registry = PositionRegistry::new();
        registry.insert(new_position(&registry, "ETH/BTC", "A"));
        registry.insert(new_position(&registry, "ETH/USDT", "B"));
        registry.insert(new_position(&registry, "ETH/BTC", "C"));

        let ids: Vec<_> = registry
            .positions_on(&pair("ETH/BTC"))
            .iter()
            .map(|p| p.lock().id)
            .collect();
        assert_eq!(ids, vec![PositionId(1), PositionId(3)]);
        assert_eq!(registry.open_count(), 3);

        registry.release_pair(&pair("ETH/BTC"), PositionId(1));
        registry.release_pair(&pair("ETH/BTC"), PositionId(3));
        assert!(registry.positions_on(&pair("ETH/BTC")).is_empty());
        assert_eq!(registry.open_count(), 1);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = PositionRegistry::new();
        let shared = registry.insert(new_position(&registry, "ETH/BTC", "A"));

        let snapshot = registry.snapshot(PositionId(1)).unwrap();
        shared.lock().status = PositionStatus::Opened;

        assert_eq!(snapshot.status(), PositionStatus::Opening);
        assert_eq!(registry.snapshots()[0].status(), PositionStatus::Opened);
    }

    #[test]
    fn test_insert_with_holds_lock_until_done() {
        let registry = PositionRegistry::new();
        let position = new_position(&registry, "ETH/BTC", "ORDER00010");

        let (shared, routed_while_held) = registry.insert_with(position, |p| {
            p.status = PositionStatus::Opened;
            let routed = registry
                .find_by_order(&OrderId::from("ORDER00010"))
                .unwrap();
            let held = routed.try_lock().is_none();
            held
        });

        assert!(routed_while_held);
        assert_eq!(shared.lock().status(), PositionStatus::Opened);
        assert_eq!(registry.positions_on(&pair("ETH/BTC")).len(), 1);
    }
}
