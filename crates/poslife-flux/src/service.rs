//! Position creation and explicit close requests.

use std::sync::Arc;

use poslife_core::{Amount, CurrencyPair, OrderSide, PositionId, StrategyRef};
use poslife_position::{Position, PositionRules};
use tracing::info;

use crate::context::FluxContext;
use crate::error::{FluxError, FluxResult};
use crate::order_id::{OrderPurpose, OrderRequest};

/// Strategy-facing entry point for position requests.
#[derive(Clone)]
pub struct PositionService {
    context: Arc<FluxContext>,
}

impl PositionService {
    pub fn new(context: Arc<FluxContext>) -> Self {
        Self { context }
    }

    /// Create an OPENING position with its opening order attached.
    ///
    /// The position is registered, saved and announced (one position update
    /// and one status update) before this returns.
    pub fn create_position(
        &self,
        strategy: StrategyRef,
        currency_pair: CurrencyPair,
        amount: Amount,
        rules: PositionRules,
    ) -> FluxResult<Position> {
        if !amount.is_positive() {
            return Err(FluxError::InvalidRequest(format!(
                "position amount must be positive, got {amount}"
            )));
        }

        let registry = self.context.registry();
        let id = registry.next_position_id();
        let request = OrderRequest {
            purpose: OrderPurpose::Opening,
            position_id: id,
            currency_pair: currency_pair.clone(),
            side: OrderSide::Buy,
            amount,
        };
        let opening_order_id = self.context.order_id_for(&request);

        let position = Position::new(id, currency_pair, amount, rules, opening_order_id, strategy);
        info!(
            position_id = %id,
            currency_pair = %position.currency_pair,
            amount = %position.amount,
            opening_order_id = %position.opening_order_id(),
            rules = %position.rules,
            strategy = %position.strategy,
            "Position created"
        );

        let (_, created) = registry.insert_with(position, |position| {
            self.context.publish(position, true);
            position.clone()
        });
        Ok(created)
    }

    /// Start closing an OPENED position regardless of its rules.
    pub fn close_position(&self, id: PositionId) -> FluxResult<Position> {
        let shared = self
            .context
            .registry()
            .get(id)
            .ok_or(FluxError::PositionNotFound(id))?;
        let mut position = shared.lock();

        self.context.begin_closing(&mut position, "close requested")?;
        self.context.publish(&position, true);
        Ok(position.clone())
    }

    /// Current state of a position.
    pub fn get_position(&self, id: PositionId) -> Option<Position> {
        self.context.registry().snapshot(id)
    }

    /// Current state of every position, ascending by ID.
    pub fn positions(&self) -> Vec<Position> {
        self.context.registry().snapshots()
    }
}
