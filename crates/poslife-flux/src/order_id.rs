//! Order identifier synthesis.
//!
//! Positions get a fresh order ID when they are created (opening order)
//! and when they start closing (closing order). Where the ID comes from is
//! pluggable: an exchange adapter would return the ID the venue assigned.

use std::sync::atomic::{AtomicU64, Ordering};

use poslife_core::{Amount, CurrencyPair, OrderId, OrderSide, PositionId};

/// Why an order is being placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPurpose {
    Opening,
    Closing,
}

/// The order a position needs an ID for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub purpose: OrderPurpose,
    pub position_id: PositionId,
    pub currency_pair: CurrencyPair,
    pub side: OrderSide,
    pub amount: Amount,
}

/// Source of order IDs.
pub trait OrderIdGenerator: Send + Sync {
    fn next_order_id(&self, request: &OrderRequest) -> OrderId;
}

/// `{prefix}{n:05}` with a monotonically increasing `n`.
#[derive(Debug)]
pub struct SequentialOrderIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialOrderIdGenerator {
    pub fn new(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(start),
        }
    }
}

impl OrderIdGenerator for SequentialOrderIdGenerator {
    fn next_order_id(&self, _request: &OrderRequest) -> OrderId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        OrderId::new(format!("{}{n:05}", self.prefix))
    }
}

/// `{prefix}{timestamp_ms}_{uuid8}`, unique across restarts.
#[derive(Debug, Clone)]
pub struct UuidOrderIdGenerator {
    prefix: String,
}

impl UuidOrderIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl OrderIdGenerator for UuidOrderIdGenerator {
    fn next_order_id(&self, _request: &OrderRequest) -> OrderId {
        OrderId::unique(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> OrderRequest {
        OrderRequest {
            purpose: OrderPurpose::Opening,
            position_id: PositionId(1),
            currency_pair: "ETH/BTC".parse().unwrap(),
            side: OrderSide::Buy,
            amount: Amount::new(dec!(10)),
        }
    }

    #[test]
    fn test_sequential_ids_are_zero_padded() {
        let generator = SequentialOrderIdGenerator::new("ORDER", 10);
        assert_eq!(generator.next_order_id(&request()).as_str(), "ORDER00010");
        assert_eq!(generator.next_order_id(&request()).as_str(), "ORDER00011");
    }

    #[test]
    fn test_uuid_ids_are_unique_and_prefixed() {
        let generator = UuidOrderIdGenerator::new("poslife_");
        let a = generator.next_order_id(&request());
        let b = generator.next_order_id(&request());

        assert!(a.as_str().starts_with("poslife_"));
        assert_ne!(a, b);
    }
}
