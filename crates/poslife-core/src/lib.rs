//! Core domain types for the poslife position lifecycle engine.
//!
//! This crate provides the value types shared by every other crate:
//! - `Price`, `Amount`: Precision-safe numeric types
//! - `Currency`, `CurrencyPair`, `CurrencyAmount`: Market identifiers
//! - `PositionId`, `OrderId`, `TradeId`, `StrategyRef`: Identifiers
//! - `Ticker`, `Trade`: Raw events consumed by the fluxes

pub mod currency;
pub mod decimal;
pub mod error;
pub mod event;
pub mod ids;

pub use currency::{Currency, CurrencyAmount, CurrencyPair};
pub use decimal::{Amount, Price};
pub use error::{CoreError, Result};
pub use event::{Arrival, Ticker, Trade};
pub use ids::{OrderId, OrderSide, PositionId, StrategyRef, TradeId};
