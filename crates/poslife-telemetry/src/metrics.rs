//! Prometheus metrics for poslife.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error best surfaced on
//! first use rather than hidden.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, HistogramVec, IntCounter, IntGauge,
};

/// Trades received by the trade flux.
/// Labels: kind (new/update)
pub static TRADES_RECEIVED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "poslife_trades_received_total",
        "Trades received after deduplication",
        &["kind"]
    )
    .unwrap()
});

/// Tickers received by the ticker flux.
/// No pair label: the set of pairs is unbounded.
pub static TICKERS_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("poslife_tickers_received_total", "Tickers received").unwrap()
});

/// Events dropped without effect.
/// Labels: flux (ticker/trade), reason (unroutable/terminal/state_mismatch/...)
pub static EVENTS_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "poslife_events_dropped_total",
        "Events dropped without effect on any position",
        &["flux", "reason"]
    )
    .unwrap()
});

/// Position status transitions.
/// Labels: status (the state entered)
pub static STATUS_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "poslife_status_transitions_total",
        "Position status transitions by entered state",
        &["status"]
    )
    .unwrap()
});

/// Failed calls into the notification or persistence boundary.
pub static BOUNDARY_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "poslife_boundary_failures_total",
        "Failed dispatches to persistence or notification collaborators",
        &["boundary"]
    )
    .unwrap()
});

/// Positions not yet CLOSED.
pub static OPEN_POSITIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("poslife_open_positions", "Positions not yet closed").unwrap()
});

/// Time to apply one event, in microseconds.
pub static EVENT_APPLY_LATENCY_US: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "poslife_event_apply_latency_us",
        "Time to apply one event to every position it touches (µs)",
        &["flux"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a deduplicated trade.
    pub fn trade_received(kind: &str) {
        TRADES_RECEIVED_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a ticker.
    pub fn ticker_received() {
        TICKERS_RECEIVED_TOTAL.inc();
    }

    /// Record an event dropped without effect.
    pub fn event_dropped(flux: &str, reason: &str) {
        EVENTS_DROPPED_TOTAL
            .with_label_values(&[flux, reason])
            .inc();
    }

    /// Record a status transition.
    ///
    /// Keeps the open position gauge in step: OPENING increments it,
    /// CLOSED decrements it.
    pub fn status_transition(status: &str) {
        STATUS_TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
        match status {
            "OPENING" => OPEN_POSITIONS.inc(),
            "CLOSED" => OPEN_POSITIONS.dec(),
            _ => {}
        }
    }

    /// Record a failed boundary dispatch.
    pub fn boundary_failure(boundary: &str) {
        BOUNDARY_FAILURES_TOTAL
            .with_label_values(&[boundary])
            .inc();
    }

    /// Record how long an event took to apply.
    pub fn event_applied(flux: &str, latency_us: f64) {
        EVENT_APPLY_LATENCY_US
            .with_label_values(&[flux])
            .observe(latency_us);
    }
}
