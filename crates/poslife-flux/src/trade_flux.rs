//! Trade flux: deduplication, routing and the position state machine.
//!
//! Each trade is deduplicated by trade ID, saved, then routed by its order
//! ID to the owning position. Under the position lock the state machine
//! applies it (possibly moving OPENING → OPENED or CLOSING → CLOSED) and the
//! position is saved and announced once.
//!
//! Re-delivered trades are applied again (last write wins) and announced
//! again; they never add a second entry to the position.

use std::sync::Arc;
use std::time::Instant;

use poslife_core::{PositionId, Trade};
use poslife_position::{
    PositionStatus, Rejection, ResolutionKind, TradeDeduplicator, TradeOutcome,
};
use poslife_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::context::FluxContext;
use crate::error::FluxResult;
use crate::msg::{FluxMsg, Mailbox};

const FLUX: &str = "trade";

/// What a trade did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeFluxOutcome {
    Applied {
        position_id: PositionId,
        kind: ResolutionKind,
        transitioned_to: Option<PositionStatus>,
    },
    Dropped {
        /// Position the order routes to, if any.
        position_id: Option<PositionId>,
        kind: ResolutionKind,
        reason: Rejection,
    },
}

impl TradeFluxOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn transitioned_to(&self) -> Option<PositionStatus> {
        match self {
            Self::Applied {
                transitioned_to, ..
            } => *transitioned_to,
            Self::Dropped { .. } => None,
        }
    }
}

/// Synchronous trade processing. Owns the deduplicator.
pub struct TradeFlux {
    context: Arc<FluxContext>,
    dedup: TradeDeduplicator,
}

impl TradeFlux {
    pub fn new(context: Arc<FluxContext>) -> Self {
        Self {
            context,
            dedup: TradeDeduplicator::new(),
        }
    }

    /// Distinct trades seen so far.
    pub fn deduplicator(&self) -> &TradeDeduplicator {
        &self.dedup
    }

    /// Apply one trade.
    pub fn process(&mut self, trade: Trade) -> TradeFluxOutcome {
        let started = Instant::now();
        let resolved = self.dedup.resolve(trade);
        let kind = resolved.kind;
        Metrics::trade_received(kind.as_str());
        self.context.save_trade(&resolved.trade);

        let outcome = self.route(resolved.trade, kind);
        Metrics::event_applied(FLUX, started.elapsed().as_micros() as f64);
        outcome
    }

    fn route(&self, trade: Trade, kind: ResolutionKind) -> TradeFluxOutcome {
        let Some(shared) = self.context.registry().find_by_order(&trade.order_id) else {
            warn!(
                trade_id = %trade.trade_id,
                order_id = %trade.order_id,
                "Trade for unknown order dropped"
            );
            Metrics::event_dropped(FLUX, Rejection::OrderMismatch.as_str());
            return TradeFluxOutcome::Dropped {
                position_id: None,
                kind,
                reason: Rejection::OrderMismatch,
            };
        };

        let mut position = shared.lock();
        let trade_id = trade.trade_id.clone();
        let outcome = position.apply_trade(trade, self.context.amount_tolerance());

        if let TradeOutcome::Rejected(reason) = outcome {
            match reason {
                Rejection::Terminal => {
                    trace!(position_id = %position.id, trade_id = %trade_id, "Trade for closed position ignored");
                }
                Rejection::OrderMismatch => {
                    warn!(position_id = %position.id, trade_id = %trade_id, "Trade order not attached to position");
                }
                Rejection::StateMismatch => {}
            }
            Metrics::event_dropped(FLUX, reason.as_str());
            return TradeFluxOutcome::Dropped {
                position_id: Some(position.id),
                kind,
                reason,
            };
        }

        let transitioned_to = outcome.transitioned_to();
        if transitioned_to == Some(PositionStatus::Closed) {
            self.context
                .registry()
                .release_pair(&position.currency_pair, position.id);
        }
        debug!(
            position_id = %position.id,
            trade_id = %trade_id,
            kind = kind.as_str(),
            status = %position.status(),
            "Trade applied"
        );

        self.context.publish(&position, transitioned_to.is_some());
        TradeFluxOutcome::Applied {
            position_id: position.id,
            kind,
            transitioned_to,
        }
    }
}

// ============================================================================
// Actor
// ============================================================================

/// Trade flux actor task.
///
/// Runs in its own tokio task, applying trades strictly in arrival order.
pub struct TradeFluxTask {
    rx: mpsc::Receiver<FluxMsg<Trade>>,
    flux: TradeFlux,
}

impl TradeFluxTask {
    pub async fn run(mut self) {
        debug!("TradeFluxTask started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                FluxMsg::Event(trade) => {
                    self.flux.process(trade);
                }
                FluxMsg::Flush(done) => {
                    let _ = done.send(());
                }
                FluxMsg::Shutdown => {
                    debug!("TradeFluxTask shutting down");
                    break;
                }
            }
        }

        debug!(
            distinct_trades = self.flux.deduplicator().len(),
            "TradeFluxTask terminated"
        );
    }
}

/// Handle for feeding the trade flux.
#[derive(Clone)]
pub struct TradeFluxHandle {
    mailbox: Mailbox<Trade>,
}

impl TradeFluxHandle {
    /// Queue a trade, waiting for channel capacity.
    pub async fn emit(&self, trade: Trade) -> FluxResult<()> {
        self.mailbox.emit(trade).await
    }

    /// Queue a trade without waiting.
    ///
    /// Returns `FluxError::QueueFull` when the channel is at capacity.
    pub fn try_emit(&self, trade: Trade) -> FluxResult<()> {
        self.mailbox.try_emit(trade)
    }

    /// Wait until every trade queued before this call has been applied.
    pub async fn flush(&self) -> FluxResult<()> {
        self.mailbox.flush().await
    }

    /// Request graceful shutdown.
    pub async fn shutdown(&self) {
        self.mailbox.shutdown().await;
    }
}

/// Spawn the trade flux actor.
pub fn spawn_trade_flux(
    context: Arc<FluxContext>,
    capacity: usize,
) -> (TradeFluxHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);

    let task = TradeFluxTask {
        rx,
        flux: TradeFlux::new(context),
    };
    let handle = TradeFluxHandle {
        mailbox: Mailbox::new(FLUX, tx),
    };

    let join_handle = tokio::spawn(task.run());

    (handle, join_handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{ChannelListener, PositionNotification, PositionListener};
    use crate::order_id::SequentialOrderIdGenerator;
    use crate::FluxError;
    use chrono::{TimeZone, Utc};
    use mockall::mock;
    use poslife_core::{Amount, OrderId, OrderSide, Price, StrategyRef, TradeId};
    use poslife_persistence::{
        InMemoryRepository, Order, PersistenceError, PersistenceResult, PositionRepository,
    };
    use poslife_position::{Position, PositionRegistry, PositionRules};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc::UnboundedReceiver;

    mock! {
        Repository {}

        impl PositionRepository for Repository {
            fn save_position(&self, position: &Position) -> PersistenceResult<()>;
            fn save_trade(&self, trade: &Trade) -> PersistenceResult<()>;
            fn find_order_by_id(&self, order_id: &OrderId) -> PersistenceResult<Option<Order>>;
            fn find_position_by_id(&self, id: PositionId) -> PersistenceResult<Option<Position>>;
            fn position_count(&self) -> PersistenceResult<usize>;
            fn trade_count(&self) -> PersistenceResult<usize>;
        }
    }

    mock! {
        Listener {}

        impl PositionListener for Listener {
            fn on_position_update(&self, position: &Position) -> FluxResult<()>;
            fn on_position_status_update(&self, position: &Position) -> FluxResult<()>;
        }
    }

    const OPENING: &str = "ORDER00010";

    fn context_with(
        repository: Arc<dyn PositionRepository>,
        listener: Arc<dyn PositionListener>,
        tolerance: Decimal,
    ) -> Arc<FluxContext> {
        Arc::new(FluxContext::new(
            Arc::new(PositionRegistry::new()),
            repository,
            listener,
            Arc::new(SequentialOrderIdGenerator::new("ORDER", 11)),
            tolerance,
        ))
    }

    fn setup() -> (Arc<FluxContext>, UnboundedReceiver<PositionNotification>) {
        let (listener, rx) = ChannelListener::new();
        let context = context_with(
            Arc::new(InMemoryRepository::new()),
            Arc::new(listener),
            Decimal::ZERO,
        );
        (context, rx)
    }

    fn add_position(context: &FluxContext) -> PositionId {
        let registry = context.registry();
        let position = Position::new(
            registry.next_position_id(),
            "ETH/BTC".parse().unwrap(),
            Amount::new(dec!(10)),
            PositionRules::default(),
            OrderId::from(OPENING),
            StrategyRef::new(1, "01"),
        );
        let id = position.id;
        registry.insert(position);
        id
    }

    fn trade(id: &str, order: &str, side: OrderSide, amount: Decimal, day: u32) -> Trade {
        Trade::new(
            TradeId::from(id),
            OrderId::from(order),
            side,
            "ETH/BTC".parse().unwrap(),
            Amount::new(amount),
            Price::new(dec!(0.03)),
        )
        .with_timestamp(Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap())
    }

    fn buy(id: &str, amount: Decimal, day: u32) -> Trade {
        trade(id, OPENING, OrderSide::Buy, amount, day)
    }

    fn drain(rx: &mut UnboundedReceiver<PositionNotification>) -> Vec<PositionNotification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    // ========================================================================
    // Routing and deduplication
    // ========================================================================

    #[test]
    fn test_duplicates_open_position_once() {
        let (context, mut rx) = setup();
        let id = add_position(&context);
        let mut flux = TradeFlux::new(context.clone());

        let outcomes = [
            flux.process(buy("000011", dec!(4), 20)),
            flux.process(buy("000011", dec!(4), 20)),
            flux.process(buy("000001", dec!(6), 1)),
            flux.process(buy("000001", dec!(6), 1)),
        ];

        assert!(outcomes.iter().all(TradeFluxOutcome::is_applied));
        let transitions: Vec<_> = outcomes.iter().filter_map(|o| o.transitioned_to()).collect();
        assert_eq!(transitions, vec![PositionStatus::Opened]);

        let notifications = drain(&mut rx);
        let updates = notifications.iter().filter(|n| !n.is_status_update()).count();
        let statuses = notifications.iter().filter(|n| n.is_status_update()).count();
        assert_eq!((updates, statuses), (4, 1));

        let p = context.registry().snapshot(id).unwrap();
        let ids: Vec<_> = p.opening_trades().iter().map(|t| t.trade_id.as_str()).collect();
        assert_eq!(ids, vec!["000001", "000011"]);
        assert_eq!(flux.deduplicator().len(), 2);
        assert_eq!(context.repository().trade_count().unwrap(), 2);
    }

    #[test]
    fn test_unknown_order_is_dropped_but_saved() {
        let (context, mut rx) = setup();
        add_position(&context);
        let mut flux = TradeFlux::new(context.clone());

        let outcome = flux.process(trade("9", "EXTERNAL", OrderSide::Buy, dec!(1), 1));

        assert_eq!(
            outcome,
            TradeFluxOutcome::Dropped {
                position_id: None,
                kind: ResolutionKind::New,
                reason: Rejection::OrderMismatch,
            }
        );
        assert!(drain(&mut rx).is_empty());
        assert_eq!(context.repository().trade_count().unwrap(), 1);
    }

    #[test]
    fn test_closed_position_drops_trades_silently() {
        let (context, mut rx) = setup();
        let id = add_position(&context);
        let mut flux = TradeFlux::new(context.clone());

        flux.process(buy("1", dec!(10), 1));
        {
            let shared = context.registry().get(id).unwrap();
            let mut p = shared.lock();
            context.begin_closing(&mut p, "test").unwrap();
        }
        let out = flux.process(trade("2", "ORDER00011", OrderSide::Sell, dec!(10), 2));
        assert_eq!(out.transitioned_to(), Some(PositionStatus::Closed));
        assert!(context.registry().positions_on(&"ETH/BTC".parse().unwrap()).is_empty());
        drain(&mut rx);

        let mut late = trade("2", "ORDER00011", OrderSide::Sell, dec!(10), 3);
        late.price = Price::new(dec!(2));
        let out = flux.process(late);

        assert_eq!(
            out,
            TradeFluxOutcome::Dropped {
                position_id: Some(id),
                kind: ResolutionKind::Update,
                reason: Rejection::Terminal,
            }
        );
        assert!(drain(&mut rx).is_empty());
        let p = context.registry().snapshot(id).unwrap();
        assert_eq!(p.closing_trades()[0].price, Price::new(dec!(0.03)));
    }

    #[test]
    fn test_tolerance_applies_to_opening() {
        let (listener, _rx) = ChannelListener::new();
        let context = context_with(
            Arc::new(InMemoryRepository::new()),
            Arc::new(listener),
            dec!(0.001),
        );
        add_position(&context);
        let mut flux = TradeFlux::new(context);

        let out = flux.process(buy("1", dec!(9.999), 1));
        assert_eq!(out.transitioned_to(), Some(PositionStatus::Opened));
    }

    // ========================================================================
    // Boundary failures
    // ========================================================================

    #[test]
    fn test_persistence_failure_does_not_undo_state() {
        let mut repository = MockRepository::new();
        repository
            .expect_save_trade()
            .times(2)
            .returning(|_| Err(PersistenceError::Backend("disk full".to_string())));
        repository
            .expect_save_position()
            .times(2)
            .returning(|_| Err(PersistenceError::Backend("disk full".to_string())));

        let (listener, mut rx) = ChannelListener::new();
        let context = context_with(Arc::new(repository), Arc::new(listener), Decimal::ZERO);
        let id = add_position(&context);
        let mut flux = TradeFlux::new(context.clone());

        flux.process(buy("1", dec!(4), 1));
        flux.process(buy("2", dec!(6), 2));

        let p = context.registry().snapshot(id).unwrap();
        assert_eq!(p.status(), PositionStatus::Opened);
        assert_eq!(drain(&mut rx).len(), 3);
    }

    #[test]
    fn test_listener_failure_is_not_retried() {
        let mut listener = MockListener::new();
        listener
            .expect_on_position_update()
            .times(1)
            .returning(|_| Err(FluxError::Notification("consumer gone".to_string())));
        listener
            .expect_on_position_status_update()
            .times(1)
            .returning(|_| Ok(()));

        let context = context_with(
            Arc::new(InMemoryRepository::new()),
            Arc::new(listener),
            Decimal::ZERO,
        );
        let id = add_position(&context);
        let mut flux = TradeFlux::new(context.clone());

        let out = flux.process(buy("1", dec!(10), 1));
        assert!(out.is_applied());
        assert_eq!(
            context.repository().find_position_by_id(id).unwrap().unwrap().status(),
            PositionStatus::Opened
        );
    }

    // ========================================================================
    // Actor
    // ========================================================================

    #[tokio::test]
    async fn test_actor_try_emit_and_flush() {
        let (context, mut rx) = setup();
        let id = add_position(&context);
        let (handle, join) = spawn_trade_flux(context.clone(), 8);

        handle.try_emit(buy("1", dec!(4), 1)).unwrap();
        handle.emit(buy("2", dec!(6), 2)).await.unwrap();
        handle.flush().await.unwrap();

        assert_eq!(
            context.registry().snapshot(id).unwrap().status(),
            PositionStatus::Opened
        );
        assert_eq!(drain(&mut rx).len(), 3);

        handle.shutdown().await;
        join.await.unwrap();
        assert!(matches!(
            handle.try_emit(buy("3", dec!(1), 3)),
            Err(FluxError::Stopped("trade"))
        ));
    }
}
