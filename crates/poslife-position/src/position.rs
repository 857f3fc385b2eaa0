//! The position entity.
//!
//! Mutation goes through [`crate::state_machine`] (trades, transitions) and
//! [`crate::price_tracker`] (tickers); this module only holds the data and
//! the values derived from it.

use chrono::{DateTime, Utc};
use poslife_core::{
    Amount, CurrencyAmount, CurrencyPair, OrderId, OrderSide, PositionId, Price, StrategyRef,
    Trade,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::rules::PositionRules;
use crate::status::PositionStatus;

/// Profit or loss of a position at a given price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gain {
    /// Percentage relative to the entry price, positive when profitable.
    pub percentage: Decimal,
    /// Absolute profit in quote currency.
    pub amount: CurrencyAmount,
}

/// A tracked trading exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Unique, monotonically assigned identifier.
    pub id: PositionId,
    /// Pair the position trades.
    pub currency_pair: CurrencyPair,
    /// Requested amount in base currency.
    pub amount: Amount,
    /// Stop-gain / stop-loss thresholds.
    pub rules: PositionRules,
    /// Strategy owning the position.
    pub strategy: StrategyRef,
    /// Creation instant.
    pub created_at: DateTime<Utc>,

    pub(crate) status: PositionStatus,
    pub(crate) opening_order_id: OrderId,
    pub(crate) opening_trades: Vec<Trade>,
    pub(crate) closing_order_id: Option<OrderId>,
    pub(crate) closing_trades: Vec<Trade>,
    pub(crate) lowest_price: Option<Price>,
    pub(crate) highest_price: Option<Price>,
    pub(crate) latest_price: Option<Price>,
}

impl Position {
    /// Create an OPENING position attached to its opening order.
    #[must_use]
    pub fn new(
        id: PositionId,
        currency_pair: CurrencyPair,
        amount: Amount,
        rules: PositionRules,
        opening_order_id: OrderId,
        strategy: StrategyRef,
    ) -> Self {
        Self {
            id,
            currency_pair,
            amount,
            rules,
            strategy,
            created_at: Utc::now(),
            status: PositionStatus::Opening,
            opening_order_id,
            opening_trades: Vec::new(),
            closing_order_id: None,
            closing_trades: Vec::new(),
            lowest_price: None,
            highest_price: None,
            latest_price: None,
        }
    }

    pub fn status(&self) -> PositionStatus {
        self.status
    }

    pub fn opening_order_id(&self) -> &OrderId {
        &self.opening_order_id
    }

    pub fn closing_order_id(&self) -> Option<&OrderId> {
        self.closing_order_id.as_ref()
    }

    /// Opening trades, ascending by timestamp.
    pub fn opening_trades(&self) -> &[Trade] {
        &self.opening_trades
    }

    /// Closing trades, ascending by timestamp.
    pub fn closing_trades(&self) -> &[Trade] {
        &self.closing_trades
    }

    pub fn lowest_price(&self) -> Option<Price> {
        self.lowest_price
    }

    pub fn highest_price(&self) -> Option<Price> {
        self.highest_price
    }

    pub fn latest_price(&self) -> Option<Price> {
        self.latest_price
    }

    /// Requested amount tagged with the base currency.
    pub fn amount_with_currency(&self) -> CurrencyAmount {
        CurrencyAmount::of_amount(self.amount, &self.currency_pair)
    }

    /// Total amount executed by the opening order.
    pub fn opened_amount(&self) -> Amount {
        self.opening_trades.iter().map(|t| t.amount).sum()
    }

    /// Total amount executed by the closing order.
    pub fn closed_amount(&self) -> Amount {
        self.closing_trades.iter().map(|t| t.amount).sum()
    }

    /// Long when the opening trades buy, short when they sell.
    ///
    /// Defaults to long before the first opening trade.
    pub fn direction(&self) -> OrderSide {
        self.opening_trades
            .first()
            .map_or(OrderSide::Buy, |trade| trade.side)
    }

    /// Volume-weighted price of the opening trades.
    pub fn entry_price(&self) -> Option<Price> {
        volume_weighted_price(&self.opening_trades)
    }

    /// Volume-weighted price of the closing trades.
    pub fn exit_price(&self) -> Option<Price> {
        volume_weighted_price(&self.closing_trades)
    }

    /// Gain percentage if the position were valued at `price`.
    ///
    /// `None` while there is no entry price or it is zero.
    pub fn gain_percentage_at(&self, price: Price) -> Option<Decimal> {
        let entry = self.entry_price()?;
        let pct = price.pct_from(entry)?;
        Some(match self.direction() {
            OrderSide::Buy => pct,
            OrderSide::Sell => -pct,
        })
    }

    /// Current gain: realised for CLOSED positions, marked to the latest
    /// ticker otherwise.
    ///
    /// `None` when the gain does not fit in a `Decimal`.
    pub fn gain(&self) -> Option<Gain> {
        let valuation = if self.status.is_terminal() {
            self.exit_price()?
        } else {
            self.latest_price?
        };
        let entry = self.entry_price()?;
        let percentage = self.gain_percentage_at(valuation)?;

        let per_unit = match self.direction() {
            OrderSide::Buy => valuation.inner().checked_sub(entry.inner())?,
            OrderSide::Sell => entry.inner().checked_sub(valuation.inner())?,
        };
        let amount = CurrencyAmount::new(
            per_unit.checked_mul(self.opened_amount().inner())?,
            self.currency_pair.quote().clone(),
        );

        Some(Gain { percentage, amount })
    }
}

fn volume_weighted_price(trades: &[Trade]) -> Option<Price> {
    let total: Amount = trades.iter().map(|t| t.amount).sum();
    if total.is_zero() {
        return None;
    }
    let notional = trades.iter().try_fold(Decimal::ZERO, |acc, t| {
        acc.checked_add(t.amount.notional(t.price)?)
    })?;
    notional.checked_div(total.inner()).map(Price::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use poslife_core::TradeId;
    use rust_decimal_macros::dec;

    fn sample_position() -> Position {
        Position::new(
            PositionId(1),
            "ETH/BTC".parse().unwrap(),
            Amount::new(dec!(10)),
            PositionRules::default(),
            OrderId::from("ORDER00010"),
            StrategyRef::new(1, "01"),
        )
    }

    fn trade(id: &str, order: &str, side: OrderSide, amount: Decimal, price: Decimal) -> Trade {
        Trade::new(
            TradeId::from(id),
            OrderId::from(order),
            side,
            "ETH/BTC".parse().unwrap(),
            Amount::new(amount),
            Price::new(price),
        )
    }

    #[test]
    fn test_new_position_is_opening_and_empty() {
        let p = sample_position();

        assert_eq!(p.status(), PositionStatus::Opening);
        assert_eq!(p.opening_order_id().as_str(), "ORDER00010");
        assert!(p.opening_trades().is_empty());
        assert!(p.closing_order_id().is_none());
        assert!(p.closing_trades().is_empty());
        assert!(p.lowest_price().is_none());
        assert!(p.highest_price().is_none());
        assert!(p.latest_price().is_none());
        assert_eq!(p.amount_with_currency().currency.code(), "ETH");
        assert!(p.gain().is_none());
    }

    #[test]
    fn test_entry_price_is_volume_weighted() {
        let mut p = sample_position();
        p.opening_trades
            .push(trade("1", "ORDER00010", OrderSide::Buy, dec!(6), dec!(1)));
        p.opening_trades
            .push(trade("2", "ORDER00010", OrderSide::Buy, dec!(4), dec!(2)));

        assert_eq!(p.opened_amount(), Amount::new(dec!(10)));
        assert_eq!(p.entry_price(), Some(Price::new(dec!(1.4))));
    }

    #[test]
    fn test_gain_percentage_long_and_short() {
        let mut long = sample_position();
        long.opening_trades
            .push(trade("1", "ORDER00010", OrderSide::Buy, dec!(10), dec!(0.03)));
        assert_eq!(
            long.gain_percentage_at(Price::new(dec!(0.18))),
            Some(dec!(500))
        );

        let mut short = sample_position();
        short
            .opening_trades
            .push(trade("1", "ORDER00010", OrderSide::Sell, dec!(10), dec!(0.03)));
        assert_eq!(short.direction(), OrderSide::Sell);
        assert_eq!(
            short.gain_percentage_at(Price::new(dec!(0.015))),
            Some(dec!(50))
        );
    }

    #[test]
    fn test_gain_uses_latest_price_then_exit_price() {
        let mut p = sample_position();
        p.opening_trades
            .push(trade("1", "ORDER00010", OrderSide::Buy, dec!(10), dec!(1)));
        p.status = PositionStatus::Opened;
        p.latest_price = Some(Price::new(dec!(1.5)));

        let gain = p.gain().unwrap();
        assert_eq!(gain.percentage, dec!(50));
        assert_eq!(gain.amount.value, dec!(5));
        assert_eq!(gain.amount.currency.code(), "BTC");

        p.closing_trades
            .push(trade("2", "ORDER00011", OrderSide::Sell, dec!(10), dec!(0.5)));
        p.status = PositionStatus::Closed;

        let gain = p.gain().unwrap();
        assert_eq!(gain.percentage, dec!(-50));
        assert_eq!(gain.amount.value, dec!(-5));
    }

    #[test]
    fn test_extreme_prices_yield_no_gain() {
        let mut p = sample_position();
        p.opening_trades.push(trade(
            "1",
            "ORDER00010",
            OrderSide::Buy,
            dec!(1),
            dec!(0.0000000001),
        ));
        p.status = PositionStatus::Opened;
        let huge = Price::new(Decimal::from_scientific("1e20").unwrap());
        p.latest_price = Some(huge);

        assert_eq!(p.entry_price(), Some(Price::new(dec!(0.0000000001))));
        assert!(p.gain_percentage_at(huge).is_none());
        assert!(p.gain().is_none());

        let mut overflowing = sample_position();
        overflowing
            .opening_trades
            .push(trade("1", "ORDER00010", OrderSide::Buy, Decimal::MAX, dec!(2)));
        assert!(overflowing.entry_price().is_none());
        assert!(overflowing.gain_percentage_at(Price::new(dec!(1))).is_none());
    }
}
