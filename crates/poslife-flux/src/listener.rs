//! Notification boundary towards the strategy.
//!
//! Listeners are called synchronously while the position lock is held, so
//! they see every mutation in application order. They must not block.

use poslife_position::Position;
use tokio::sync::mpsc;

use crate::error::{FluxError, FluxResult};

/// Receives position change notifications.
pub trait PositionListener: Send + Sync {
    /// Any observable change of a position (trade applied, prices moved).
    fn on_position_update(&self, position: &Position) -> FluxResult<()>;

    /// The position entered a new status.
    fn on_position_status_update(&self, position: &Position) -> FluxResult<()>;
}

/// A notification as forwarded by [`ChannelListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionNotification {
    PositionUpdated(Position),
    StatusUpdated(Position),
}

impl PositionNotification {
    pub fn position(&self) -> &Position {
        match self {
            Self::PositionUpdated(p) | Self::StatusUpdated(p) => p,
        }
    }

    pub fn is_status_update(&self) -> bool {
        matches!(self, Self::StatusUpdated(_))
    }
}

/// Forwards snapshots into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<PositionNotification>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PositionNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, notification: PositionNotification) -> FluxResult<()> {
        self.tx
            .send(notification)
            .map_err(|_| FluxError::Notification("notification receiver dropped".to_string()))
    }
}

impl PositionListener for ChannelListener {
    fn on_position_update(&self, position: &Position) -> FluxResult<()> {
        self.forward(PositionNotification::PositionUpdated(position.clone()))
    }

    fn on_position_status_update(&self, position: &Position) -> FluxResult<()> {
        self.forward(PositionNotification::StatusUpdated(position.clone()))
    }
}
