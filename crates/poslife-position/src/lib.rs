//! Position lifecycle for poslife.
//!
//! Owns everything that mutates a position: the OPENING → OPENED →
//! CLOSING → CLOSED state machine, stop-gain/stop-loss evaluation,
//! price extremes tracking and trade deduplication.
//!
//! # Key Components
//!
//! - [`Position`]: The tracked exposure and its state machine
//! - [`PositionStatus`]: Lifecycle states, forward-only
//! - [`PositionRules`]: Optional stop-gain / stop-loss thresholds
//! - [`evaluate`]: Decides whether an OPENED position must close
//! - [`observe`]: Updates lowest/highest/latest price of an open position
//! - [`TradeDeduplicator`]: Collapses re-delivered trades by trade ID
//! - [`PositionRegistry`]: Per-position exclusive access plus routing indexes

pub mod dedup;
pub mod error;
pub mod position;
pub mod price_tracker;
pub mod registry;
pub mod rules;
pub mod state_machine;
pub mod status;

pub use dedup::{ResolutionKind, ResolvedTrade, TradeDeduplicator};
pub use error::{PositionError, PositionResult};
pub use position::{Gain, Position};
pub use price_tracker::{observe, PriceExtremesDelta};
pub use registry::{PositionRegistry, SharedPosition};
pub use rules::{evaluate, CloseDecision, PositionRules, PositionRulesBuilder};
pub use state_machine::{Rejection, TradeOutcome};
pub use status::PositionStatus;
