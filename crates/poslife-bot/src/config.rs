//! Application configuration.

use std::sync::Arc;

use poslife_flux::{
    EngineConfig, OrderIdGenerator, SequentialOrderIdGenerator, UuidOrderIdGenerator,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// How order IDs are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderIdKind {
    /// `{prefix}{n:05}`, deterministic across runs.
    #[default]
    Sequential,
    /// `{prefix}{timestamp_ms}_{uuid8}`, unique across runs.
    Uuid,
}

/// Position matching settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSection {
    /// Largest difference at which filled and requested amounts match.
    #[serde(default)]
    pub amount_tolerance: Decimal,
}

/// Order ID settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersConfig {
    #[serde(default = "default_order_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub kind: OrderIdKind,
    /// First sequence number (sequential kind only).
    #[serde(default = "default_order_start")]
    pub start: u64,
}

fn default_order_prefix() -> String {
    "ORDER".to_string()
}

fn default_order_start() -> u64 {
    1
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            prefix: default_order_prefix(),
            kind: OrderIdKind::default(),
            start: default_order_start(),
        }
    }
}

/// Flux channel capacities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluxSection {
    #[serde(default = "default_capacity")]
    pub ticker_capacity: usize,
    #[serde(default = "default_capacity")]
    pub trade_capacity: usize,
}

fn default_capacity() -> usize {
    1024
}

impl Default for FluxSection {
    fn default() -> Self {
        Self {
            ticker_capacity: default_capacity(),
            trade_capacity: default_capacity(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub orders: OrdersConfig,
    #[serde(default)]
    pub flux: FluxSection,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Library-side engine settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            amount_tolerance: self.engine.amount_tolerance,
            ticker_capacity: self.flux.ticker_capacity,
            trade_capacity: self.flux.trade_capacity,
        }
    }

    /// Order ID generator selected by `[orders] kind`.
    pub fn order_id_generator(&self) -> Arc<dyn OrderIdGenerator> {
        match self.orders.kind {
            OrderIdKind::Sequential => Arc::new(SequentialOrderIdGenerator::new(
                self.orders.prefix.clone(),
                self.orders.start,
            )),
            OrderIdKind::Uuid => Arc::new(UuidOrderIdGenerator::new(self.orders.prefix.clone())),
        }
    }
}
