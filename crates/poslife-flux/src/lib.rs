//! Event coordination for poslife.
//!
//! Two actors consume the raw event streams:
//! - the ticker flux fans tickers out to open positions (price extremes,
//!   stop rules, CLOSING transitions)
//! - the trade flux deduplicates trades and feeds them to the position
//!   state machine (OPENED and CLOSED transitions)
//!
//! Both share a [`FluxContext`]: the position registry plus the
//! persistence, notification and order ID boundaries. [`PositionService`]
//! creates positions and handles explicit close requests; [`Engine`] wires
//! everything together.
//!
//! # Example
//!
//! ```ignore
//! let (listener, mut notifications) = ChannelListener::new();
//! let engine = Engine::start(
//!     &EngineConfig::default(),
//!     Arc::new(InMemoryRepository::new()),
//!     Arc::new(listener),
//!     Arc::new(SequentialOrderIdGenerator::new("ORDER", 1)),
//! )?;
//! engine.tickers().emit(ticker).await?;
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod listener;
pub mod msg;
pub mod order_id;
pub mod service;
pub mod ticker_flux;
pub mod trade_flux;

pub use config::EngineConfig;
pub use context::FluxContext;
pub use engine::Engine;
pub use error::{FluxError, FluxResult};
pub use listener::{ChannelListener, PositionListener, PositionNotification};
pub use msg::FluxMsg;
pub use order_id::{
    OrderIdGenerator, OrderPurpose, OrderRequest, SequentialOrderIdGenerator,
    UuidOrderIdGenerator,
};
pub use service::PositionService;
pub use ticker_flux::{spawn_ticker_flux, TickerFlux, TickerFluxHandle, TickerOutcome};
pub use trade_flux::{spawn_trade_flux, TradeFlux, TradeFluxHandle, TradeFluxOutcome};
