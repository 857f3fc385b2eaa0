//! Listener that reports position changes through `tracing`.

use poslife_core::CurrencyAmount;
use poslife_flux::{FluxResult, PositionListener};
use poslife_position::Position;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl PositionListener for LoggingListener {
    fn on_position_update(&self, position: &Position) -> FluxResult<()> {
        debug!(
            position_id = %position.id,
            status = %position.status(),
            opened = %position.opened_amount(),
            closed = %position.closed_amount(),
            latest = ?position
                .latest_price()
                .map(|p| CurrencyAmount::of_price(p, &position.currency_pair).to_string()),
            "Position updated"
        );
        Ok(())
    }

    fn on_position_status_update(&self, position: &Position) -> FluxResult<()> {
        let gain = position.gain().map(|g| g.percentage.round_dp(2).to_string());
        info!(
            position_id = %position.id,
            currency_pair = %position.currency_pair,
            status = %position.status(),
            gain_percentage = ?gain,
            "Position status updated"
        );
        Ok(())
    }
}
