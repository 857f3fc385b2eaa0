//! Wiring of the registry, the boundaries and both flux actors.

use std::sync::Arc;

use poslife_persistence::PositionRepository;
use poslife_position::PositionRegistry;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::EngineConfig;
use crate::context::FluxContext;
use crate::error::{FluxError, FluxResult};
use crate::listener::PositionListener;
use crate::order_id::OrderIdGenerator;
use crate::service::PositionService;
use crate::ticker_flux::{spawn_ticker_flux, TickerFluxHandle};
use crate::trade_flux::{spawn_trade_flux, TradeFluxHandle};

/// A running position lifecycle engine.
///
/// Must be started from within a tokio runtime.
pub struct Engine {
    context: Arc<FluxContext>,
    service: PositionService,
    tickers: TickerFluxHandle,
    trades: TradeFluxHandle,
    ticker_task: JoinHandle<()>,
    trade_task: JoinHandle<()>,
}

impl Engine {
    /// Validate `config` and spawn both fluxes.
    pub fn start(
        config: &EngineConfig,
        repository: Arc<dyn PositionRepository>,
        listener: Arc<dyn PositionListener>,
        order_ids: Arc<dyn OrderIdGenerator>,
    ) -> FluxResult<Self> {
        config.validate()?;

        let context = Arc::new(FluxContext::new(
            Arc::new(PositionRegistry::new()),
            repository,
            listener,
            order_ids,
            config.amount_tolerance,
        ));
        let (tickers, ticker_task) = spawn_ticker_flux(context.clone(), config.ticker_capacity);
        let (trades, trade_task) = spawn_trade_flux(context.clone(), config.trade_capacity);

        info!(
            amount_tolerance = %config.amount_tolerance,
            ticker_capacity = config.ticker_capacity,
            trade_capacity = config.trade_capacity,
            "Engine started"
        );

        Ok(Self {
            service: PositionService::new(context.clone()),
            context,
            tickers,
            trades,
            ticker_task,
            trade_task,
        })
    }

    pub fn positions(&self) -> &PositionService {
        &self.service
    }

    pub fn tickers(&self) -> &TickerFluxHandle {
        &self.tickers
    }

    pub fn trades(&self) -> &TradeFluxHandle {
        &self.trades
    }

    pub fn registry(&self) -> &Arc<PositionRegistry> {
        self.context.registry()
    }

    pub fn repository(&self) -> &Arc<dyn PositionRepository> {
        self.context.repository()
    }

    /// Wait until both fluxes have applied everything queued so far.
    pub async fn flush(&self) -> FluxResult<()> {
        self.tickers.flush().await?;
        self.trades.flush().await
    }

    /// Stop both fluxes after they drain their queues.
    pub async fn shutdown(self) -> FluxResult<()> {
        self.tickers.shutdown().await;
        self.trades.shutdown().await;

        self.ticker_task
            .await
            .map_err(|e| FluxError::TaskFailed(e.to_string()))?;
        self.trade_task
            .await
            .map_err(|e| FluxError::TaskFailed(e.to_string()))?;

        info!(
            positions = self.context.registry().len(),
            open = self.context.registry().open_count(),
            "Engine stopped"
        );
        Ok(())
    }
}
