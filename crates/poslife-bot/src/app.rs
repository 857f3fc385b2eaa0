//! Main application orchestration.
//!
//! Starts the engine with the in-memory repository, then feeds it one
//! command per input line. Both fluxes are flushed after every command so
//! the input order is the application order.

use std::sync::Arc;

use poslife_flux::{Engine, FluxError, PositionListener};
use poslife_persistence::{InMemoryRepository, PositionRepository};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::listener::LoggingListener;

/// Totals logged when the input is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Commands applied.
    pub commands: usize,
    /// Lines that could not be parsed or were refused by the engine.
    pub rejected: usize,
    pub positions: usize,
    pub open_positions: usize,
    pub stored_trades: usize,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    repository: Arc<InMemoryRepository>,
    listener: Arc<dyn PositionListener>,
}

impl Application {
    /// Create a new application.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.engine_config().validate()?;

        Ok(Self {
            config,
            repository: Arc::new(InMemoryRepository::new()),
            listener: Arc::new(LoggingListener),
        })
    }

    /// Replace the logging listener.
    pub fn with_listener(mut self, listener: Arc<dyn PositionListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn repository(&self) -> Arc<InMemoryRepository> {
        Arc::clone(&self.repository)
    }

    /// Apply every command read from `input`, then stop the engine.
    pub async fn run<R>(self, input: R) -> AppResult<RunSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let engine = Engine::start(
            &self.config.engine_config(),
            self.repository.clone(),
            self.listener.clone(),
            self.config.order_id_generator(),
        )?;

        let mut summary = RunSummary::default();
        let mut lines = input.lines();
        let mut line_no = 0;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;

            let result = match Command::parse_line(line_no, &line) {
                Ok(Some(command)) => apply(&engine, command).await,
                Ok(None) => continue,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => summary.commands += 1,
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    warn!(line = line_no, error = %e, "Command rejected");
                    summary.rejected += 1;
                }
            }
        }

        summary.positions = engine.registry().len();
        summary.open_positions = engine.registry().open_count();
        summary.stored_trades = self.repository.trade_count()?;
        engine.shutdown().await?;

        info!(
            commands = summary.commands,
            rejected = summary.rejected,
            positions = summary.positions,
            open_positions = summary.open_positions,
            stored_trades = summary.stored_trades,
            "Input exhausted"
        );
        Ok(summary)
    }
}

async fn apply(engine: &Engine, command: Command) -> AppResult<()> {
    debug!(kind = command.kind(), "Applying command");

    match command {
        Command::OpenPosition(open) => {
            let position = engine.positions().create_position(
                open.strategy_ref(),
                open.currency_pair.clone(),
                open.amount,
                open.rules(),
            )?;
            info!(
                position_id = %position.id,
                opening_order_id = %position.opening_order_id(),
                "Position requested"
            );
        }
        Command::ClosePosition { .. } => {
            if let Some(id) = command.close_target() {
                engine.positions().close_position(id)?;
            }
        }
        Command::Ticker(ticker) => engine.tickers().emit(ticker).await?,
        Command::Trade(trade) => engine.trades().emit(trade).await?,
    }

    engine.flush().await?;
    Ok(())
}

/// Errors that mean the engine can no longer make progress.
fn is_fatal(error: &AppError) -> bool {
    matches!(
        error,
        AppError::Io(_) | AppError::Flux(FluxError::Stopped(_) | FluxError::TaskFailed(_))
    )
}
