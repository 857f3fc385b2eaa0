//! Collaborators shared by the service and both fluxes.

use std::sync::Arc;

use poslife_core::{OrderId, Trade};
use poslife_persistence::PositionRepository;
use poslife_position::{Position, PositionRegistry, PositionStatus};
use poslife_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{FluxError, FluxResult};
use crate::listener::PositionListener;
use crate::order_id::{OrderIdGenerator, OrderPurpose, OrderRequest};

/// Registry plus the persistence, notification and order ID boundaries.
pub struct FluxContext {
    registry: Arc<PositionRegistry>,
    repository: Arc<dyn PositionRepository>,
    listener: Arc<dyn PositionListener>,
    order_ids: Arc<dyn OrderIdGenerator>,
    amount_tolerance: Decimal,
}

impl FluxContext {
    pub fn new(
        registry: Arc<PositionRegistry>,
        repository: Arc<dyn PositionRepository>,
        listener: Arc<dyn PositionListener>,
        order_ids: Arc<dyn OrderIdGenerator>,
        amount_tolerance: Decimal,
    ) -> Self {
        Self {
            registry,
            repository,
            listener,
            order_ids,
            amount_tolerance,
        }
    }

    pub fn registry(&self) -> &Arc<PositionRegistry> {
        &self.registry
    }

    pub fn repository(&self) -> &Arc<dyn PositionRepository> {
        &self.repository
    }

    pub fn amount_tolerance(&self) -> Decimal {
        self.amount_tolerance
    }

    pub(crate) fn order_id_for(&self, request: &OrderRequest) -> OrderId {
        self.order_ids.next_order_id(request)
    }

    /// Move an OPENED position to CLOSING under a fresh closing order.
    ///
    /// The caller holds the position lock.
    pub(crate) fn begin_closing(&self, position: &mut Position, reason: &str) -> FluxResult<()> {
        if !position.status().can_transition_to(PositionStatus::Closing) {
            return Err(FluxError::InvalidRequest(format!(
                "position {} is {}, only OPENED positions can close",
                position.id,
                position.status()
            )));
        }

        let request = OrderRequest {
            purpose: OrderPurpose::Closing,
            position_id: position.id,
            currency_pair: position.currency_pair.clone(),
            side: position.direction().opposite(),
            amount: position.opened_amount(),
        };
        let closing_order_id = self.order_id_for(&request);
        position.begin_closing(closing_order_id.clone())?;
        self.registry
            .register_order(closing_order_id.clone(), position.id);

        info!(
            position_id = %position.id,
            closing_order_id = %closing_order_id,
            reason,
            "Closing position"
        );
        Ok(())
    }

    /// Persist and announce a mutated position.
    ///
    /// The caller holds the position lock, which keeps notifications in
    /// application order. Boundary failures are logged and not retried.
    pub(crate) fn publish(&self, position: &Position, status_changed: bool) {
        if let Err(e) = self.repository.save_position(position) {
            Metrics::boundary_failure("persistence");
            warn!(position_id = %position.id, error = %e, "Failed to save position");
        }

        if let Err(e) = self.listener.on_position_update(position) {
            Metrics::boundary_failure("notification");
            warn!(position_id = %position.id, error = %e, "Position update not delivered");
        }

        if status_changed {
            Metrics::status_transition(position.status().as_str());
            if let Err(e) = self.listener.on_position_status_update(position) {
                Metrics::boundary_failure("notification");
                warn!(
                    position_id = %position.id,
                    status = %position.status(),
                    error = %e,
                    "Position status update not delivered"
                );
            }
        }
    }

    pub(crate) fn save_trade(&self, trade: &Trade) {
        if let Err(e) = self.repository.save_trade(trade) {
            Metrics::boundary_failure("persistence");
            warn!(trade_id = %trade.trade_id, order_id = %trade.order_id, error = %e, "Failed to save trade");
        }
    }
}
