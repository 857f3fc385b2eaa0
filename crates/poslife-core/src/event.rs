//! Raw events delivered by exchange connectivity.

use crate::currency::CurrencyPair;
use crate::decimal::{Amount, Price};
use crate::ids::{OrderId, OrderSide, TradeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last traded price for a currency pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub currency_pair: CurrencyPair,
    pub last: Price,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Ticker {
    pub fn new(currency_pair: CurrencyPair, last: Price) -> Self {
        Self {
            currency_pair,
            last,
            timestamp: None,
        }
    }
}

/// When and in which order the engine first saw a trade.
///
/// Stamped once by the trade deduplicator and kept across re-deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Arrival {
    pub at: DateTime<Utc>,
    pub sequence: u64,
}

/// An execution against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub order_id: OrderId,
    pub side: OrderSide,
    pub currency_pair: CurrencyPair,
    /// Executed amount in base currency.
    pub amount: Amount,
    /// Execution price in quote currency.
    pub price: Price,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub arrival: Option<Arrival>,
}

impl Trade {
    pub fn new(
        trade_id: TradeId,
        order_id: OrderId,
        side: OrderSide,
        currency_pair: CurrencyPair,
        amount: Amount,
        price: Price,
    ) -> Self {
        Self {
            trade_id,
            order_id,
            side,
            currency_pair,
            amount,
            price,
            timestamp: None,
            arrival: None,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Key trades are ordered by inside a position.
    ///
    /// The exchange timestamp wins; trades without one fall back to their
    /// arrival instant. Arrival sequence breaks ties.
    pub fn ordering_key(&self) -> (DateTime<Utc>, u64) {
        let sequence = self.arrival.map_or(u64::MAX, |a| a.sequence);
        let at = self
            .timestamp
            .or(self.arrival.map(|a| a.at))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        (at, sequence)
    }
}
