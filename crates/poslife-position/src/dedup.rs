//! Trade deduplication by trade ID.
//!
//! Exchanges re-deliver trades (reconnects, REST/WS overlap) and sometimes
//! correct them later under the same trade ID. The deduplicator keeps the
//! last delivery of every trade ID and tells the caller whether an event is
//! a new trade or an update of a known one.
//!
//! Owned by the trade flux; there is no process-wide instance.
//!
//! # Retention
//!
//! Entries are kept for the lifetime of the flux, including trades of
//! CLOSED positions, so a late re-delivery is still reported as an
//! `Update`. Memory grows with the number of distinct trade IDs seen.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use poslife_core::{Arrival, OrderId, Trade, TradeId};
use tracing::trace;

/// Whether a trade ID was seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    New,
    Update,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Update => "update",
        }
    }
}

/// A trade after deduplication, stamped with its arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrade {
    pub trade: Trade,
    pub kind: ResolutionKind,
    /// For updates: whether any field differs from the stored delivery.
    pub changed: bool,
}

/// Canonical store of every trade seen, keyed by trade ID.
#[derive(Debug, Default)]
pub struct TradeDeduplicator {
    trades: HashMap<TradeId, Trade>,
    trades_by_order: HashMap<OrderId, BTreeSet<TradeId>>,
    next_sequence: u64,
}

impl TradeDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a raw trade event.
    ///
    /// The stored trade is overwritten with the event's fields
    /// (last-write-wins); the arrival stamp of the first delivery is kept.
    pub fn resolve(&mut self, mut trade: Trade) -> ResolvedTrade {
        match self.trades.get_mut(&trade.trade_id) {
            Some(stored) => {
                trade.arrival = stored.arrival;
                let changed = *stored != trade;

                if stored.order_id != trade.order_id {
                    if let Some(ids) = self.trades_by_order.get_mut(&stored.order_id) {
                        ids.remove(&trade.trade_id);
                    }
                    self.trades_by_order
                        .entry(trade.order_id.clone())
                        .or_default()
                        .insert(trade.trade_id.clone());
                }
                *stored = trade.clone();

                trace!(trade_id = %trade.trade_id, changed, "Trade re-delivered");
                ResolvedTrade {
                    trade,
                    kind: ResolutionKind::Update,
                    changed,
                }
            }
            None => {
                trade.arrival = Some(Arrival {
                    at: Utc::now(),
                    sequence: self.next_sequence,
                });
                self.next_sequence += 1;

                self.trades_by_order
                    .entry(trade.order_id.clone())
                    .or_default()
                    .insert(trade.trade_id.clone());
                self.trades.insert(trade.trade_id.clone(), trade.clone());

                trace!(trade_id = %trade.trade_id, order_id = %trade.order_id, "New trade");
                ResolvedTrade {
                    trade,
                    kind: ResolutionKind::New,
                    changed: true,
                }
            }
        }
    }

    /// Latest delivery of a trade.
    pub fn get(&self, trade_id: &TradeId) -> Option<&Trade> {
        self.trades.get(trade_id)
    }

    /// Trades executed against an order, by trade ID.
    pub fn trades_for_order(&self, order_id: &OrderId) -> Vec<&Trade> {
        self.trades_by_order
            .get(order_id)
            .map(|ids| ids.iter().filter_map(|id| self.trades.get(id)).collect())
            .unwrap_or_default()
    }

    /// Number of distinct trade IDs seen.
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poslife_core::{Amount, OrderSide, Price};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn trade(id: &str, order: &str) -> Trade {
        Trade::new(
            TradeId::from(id),
            OrderId::from(order),
            OrderSide::Sell,
            "ETH/BTC".parse().unwrap(),
            Amount::new(dec!(5)),
            Price::new(dec!(1)),
        )
    }

    #[test]
    fn test_first_delivery_is_new() {
        let mut dedup = TradeDeduplicator::new();
        let resolved = dedup.resolve(trade("000003", "ORDER00011"));

        assert_eq!(resolved.kind, ResolutionKind::New);
        assert!(resolved.trade.arrival.is_some());
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_identical_redelivery_is_unchanged_update() {
        let mut dedup = TradeDeduplicator::new();
        let first = dedup.resolve(trade("000003", "ORDER00011"));
        let second = dedup.resolve(trade("000003", "ORDER00011"));

        assert_eq!(second.kind, ResolutionKind::Update);
        assert!(!second.changed);
        assert_eq!(second.trade.arrival, first.trade.arrival);
        assert_eq!(dedup.len(), 1);
        assert_eq!(dedup.trades_for_order(&OrderId::from("ORDER00011")).len(), 1);
    }

    #[test]
    fn test_redelivery_with_new_price_overwrites() {
        let mut dedup = TradeDeduplicator::new();
        dedup.resolve(trade("000004", "ORDER00011"));

        let mut corrected = trade("000004", "ORDER00011");
        corrected.price = Price::new(dec!(2));
        let resolved = dedup.resolve(corrected);

        assert_eq!(resolved.kind, ResolutionKind::Update);
        assert!(resolved.changed);
        assert_eq!(
            dedup.get(&TradeId::from("000004")).map(|t| t.price),
            Some(Price::new(dec!(2)))
        );
    }

    #[test]
    fn test_order_reassignment_moves_trade() {
        let mut dedup = TradeDeduplicator::new();
        dedup.resolve(trade("1", "A"));
        dedup.resolve(trade("1", "B"));

        assert!(dedup.trades_for_order(&OrderId::from("A")).is_empty());
        assert_eq!(dedup.trades_for_order(&OrderId::from("B")).len(), 1);
    }

    #[test]
    fn test_arrival_sequence_is_monotonic() {
        let mut dedup = TradeDeduplicator::new();
        let a = dedup.resolve(trade("1", "A")).trade.arrival.unwrap();
        let b = dedup.resolve(trade("2", "A")).trade.arrival.unwrap();
        assert!(a.sequence < b.sequence);
    }

    proptest! {
        /// Store size equals the number of distinct IDs, whatever the re-deliveries.
        #[test]
        fn redeliveries_do_not_grow_store(ids in prop::collection::vec(0u8..8, 1..64)) {
            let mut dedup = TradeDeduplicator::new();
            let mut new_count = 0;
            for id in &ids {
                if dedup.resolve(trade(&id.to_string(), "ORDER")).kind == ResolutionKind::New {
                    new_count += 1;
                }
            }

            let distinct: BTreeSet<_> = ids.iter().collect();
            prop_assert_eq!(dedup.len(), distinct.len());
            prop_assert_eq!(new_count, distinct.len());
            prop_assert_eq!(dedup.trades_for_order(&OrderId::from("ORDER")).len(), distinct.len());
        }
    }
}
