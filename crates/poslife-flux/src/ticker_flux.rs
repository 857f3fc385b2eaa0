//! Ticker flux: price tracking and stop rules.
//!
//! Every ticker is fanned out to the positions open on its currency pair.
//! For each of them, under the position lock:
//! 1. lowest / highest / latest price are updated (OPENED and CLOSING only)
//! 2. stop rules are evaluated (OPENED only)
//! 3. a breached rule moves the position to CLOSING with a new closing order
//! 4. the position is saved and announced once
//!
//! Positions that are still OPENING ignore tickers entirely.

use std::sync::Arc;
use std::time::Instant;

use poslife_core::{PositionId, Ticker};
use poslife_position::{evaluate, observe};
use poslife_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::context::FluxContext;
use crate::error::FluxResult;
use crate::msg::{FluxMsg, Mailbox};

const FLUX: &str = "ticker";

/// What a ticker did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerOutcome {
    /// Positions whose prices changed, ascending by ID.
    pub updated: Vec<PositionId>,
    /// Positions moved to CLOSING by this ticker.
    pub closing: Vec<PositionId>,
}

impl TickerOutcome {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
    }
}

/// Synchronous ticker processing.
pub struct TickerFlux {
    context: Arc<FluxContext>,
}

impl TickerFlux {
    pub fn new(context: Arc<FluxContext>) -> Self {
        Self { context }
    }

    /// Apply one ticker to every position on its pair.
    pub fn process(&self, ticker: Ticker) -> TickerOutcome {
        let started = Instant::now();
        Metrics::ticker_received();
        trace!(currency_pair = %ticker.currency_pair, last = %ticker.last, "Ticker received");

        let mut outcome = TickerOutcome::default();
        for shared in self.context.registry().positions_on(&ticker.currency_pair) {
            let mut position = shared.lock();

            let Some(delta) = observe(&mut position, ticker.last) else {
                trace!(position_id = %position.id, status = %position.status(), "Ticker ignored");
                continue;
            };
            if delta.lowest_changed || delta.highest_changed {
                debug!(
                    position_id = %position.id,
                    lowest = ?position.lowest_price(),
                    highest = ?position.highest_price(),
                    "Price extremes moved"
                );
            }

            let decision = evaluate(&position, ticker.last);
            let mut status_changed = false;
            if decision.should_close() {
                match self
                    .context
                    .begin_closing(&mut position, &decision.to_string())
                {
                    Ok(()) => {
                        status_changed = true;
                        outcome.closing.push(position.id);
                    }
                    Err(e) => {
                        warn!(position_id = %position.id, error = %e, "Failed to start closing");
                    }
                }
            }

            self.context.publish(&position, status_changed);
            outcome.updated.push(position.id);
        }

        if outcome.is_empty() {
            Metrics::event_dropped(FLUX, "no_open_position");
        }
        Metrics::event_applied(FLUX, started.elapsed().as_micros() as f64);
        outcome
    }
}

// ============================================================================
// Actor
// ============================================================================

/// Ticker flux actor task.
///
/// Runs in its own tokio task, applying tickers strictly in arrival order.
pub struct TickerFluxTask {
    rx: mpsc::Receiver<FluxMsg<Ticker>>,
    flux: TickerFlux,
}

impl TickerFluxTask {
    pub async fn run(mut self) {
        debug!("TickerFluxTask started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                FluxMsg::Event(ticker) => {
                    self.flux.process(ticker);
                }
                FluxMsg::Flush(done) => {
                    let _ = done.send(());
                }
                FluxMsg::Shutdown => {
                    debug!("TickerFluxTask shutting down");
                    break;
                }
            }
        }

        debug!("TickerFluxTask terminated");
    }
}

/// Handle for feeding the ticker flux.
#[derive(Clone)]
pub struct TickerFluxHandle {
    mailbox: Mailbox<Ticker>,
}

impl TickerFluxHandle {
    /// Queue a ticker, waiting for channel capacity.
    pub async fn emit(&self, ticker: Ticker) -> FluxResult<()> {
        self.mailbox.emit(ticker).await
    }

    /// Queue a ticker without waiting.
    ///
    /// Returns `FluxError::QueueFull` when the channel is at capacity.
    pub fn try_emit(&self, ticker: Ticker) -> FluxResult<()> {
        self.mailbox.try_emit(ticker)
    }

    /// Wait until every ticker queued before this call has been applied.
    pub async fn flush(&self) -> FluxResult<()> {
        self.mailbox.flush().await
    }

    /// Request graceful shutdown.
    pub async fn shutdown(&self) {
        self.mailbox.shutdown().await;
    }
}

/// Spawn the ticker flux actor.
pub fn spawn_ticker_flux(
    context: Arc<FluxContext>,
    capacity: usize,
) -> (TickerFluxHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);

    let task = TickerFluxTask {
        rx,
        flux: TickerFlux::new(context),
    };
    let handle = TickerFluxHandle {
        mailbox: Mailbox::new(FLUX, tx),
    };

    let join_handle = tokio::spawn(task.run());

    (handle, join_handle)
}
