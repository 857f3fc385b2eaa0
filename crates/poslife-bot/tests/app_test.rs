//! Command stream processing through the application.

use std::sync::Arc;

use poslife_bot::{AppConfig, Application};
use poslife_core::{OrderId, PositionId};
use poslife_flux::{ChannelListener, PositionNotification};
use poslife_persistence::PositionRepository;
use poslife_position::PositionStatus;

const LIFECYCLE: &str = r#"
# Position 1: opened by two trades, closed by stop gain
{"kind":"open_position","currency_pair":"ETH/BTC","amount":"10","stop_gain_percentage":"1000","stop_loss_percentage":"100"}
{"kind":"trade","trade_id":"000011","order_id":"ORDER00001","side":"buy","currency_pair":"ETH/BTC","amount":"4","price":"0.03","timestamp":"2020-02-02T00:00:00Z"}
{"kind":"trade","trade_id":"000001","order_id":"ORDER00001","side":"buy","currency_pair":"ETH/BTC","amount":"6","price":"0.03","timestamp":"2020-01-01T00:00:00Z"}
{"kind":"trade","trade_id":"000001","order_id":"ORDER00001","side":"buy","currency_pair":"ETH/BTC","amount":"6","price":"0.03","timestamp":"2020-01-01T00:00:00Z"}
{"kind":"ticker","currency_pair":"ETH/BTC","last":"0.18"}
{"kind":"ticker","currency_pair":"ETH/BTC","last":"100"}
{"kind":"trade","trade_id":"000003","order_id":"ORDER00002","side":"sell","currency_pair":"ETH/BTC","amount":"10","price":"1"}

# Position 2: opened, then closed on request
{"kind":"open_position","currency_pair":"ETH/USDT","amount":"1"}
{"kind":"trade","trade_id":"000004","order_id":"ORDER00003","side":"buy","currency_pair":"ETH/USDT","amount":"1","price":"2000"}
{"kind":"close_position","position_id":2}
"#;

fn statuses_of(
    id: PositionId,
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<PositionNotification>,
) -> Vec<PositionStatus> {
    let mut statuses = Vec::new();
    while let Ok(n) = rx.try_recv() {
        if n.is_status_update() && n.position().id == id {
            statuses.push(n.position().status());
        }
    }
    statuses
}

#[tokio::test]
async fn test_command_stream_drives_positions() {
    let (listener, mut rx) = ChannelListener::new();
    let app = Application::new(AppConfig::default())
        .unwrap()
        .with_listener(Arc::new(listener));
    let repository = app.repository();

    let summary = app.run(LIFECYCLE.as_bytes()).await.unwrap();

    assert_eq!(summary.commands, 10);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.positions, 2);
    assert_eq!(summary.open_positions, 1);
    assert_eq!(summary.stored_trades, 4);

    let p1 = repository.find_position_by_id(PositionId(1)).unwrap().unwrap();
    assert_eq!(p1.status(), PositionStatus::Closed);
    assert_eq!(p1.closing_order_id().map(OrderId::as_str), Some("ORDER00002"));

    let p2 = repository.find_position_by_id(PositionId(2)).unwrap().unwrap();
    assert_eq!(p2.status(), PositionStatus::Closing);
    assert_eq!(p2.closing_order_id().map(OrderId::as_str), Some("ORDER00004"));

    assert_eq!(
        statuses_of(PositionId(1), &mut rx),
        vec![
            PositionStatus::Opening,
            PositionStatus::Opened,
            PositionStatus::Closing,
            PositionStatus::Closed,
        ]
    );
}

#[tokio::test]
async fn test_bad_lines_are_counted_not_fatal() {
    let input = concat!(
        "{\"kind\":\"open_position\",\"currency_pair\":\"ETH/BTC\",\"amount\":\"0\"}\n",
        "not json\n",
        "{\"kind\":\"close_position\",\"position_id\":42}\n",
        "{\"kind\":\"ticker\",\"currency_pair\":\"ETH/BTC\",\"last\":\"1\"}\n",
    );

    let app = Application::new(AppConfig::default()).unwrap();
    let summary = app.run(input.as_bytes()).await.unwrap();

    assert_eq!(summary.commands, 1);
    assert_eq!(summary.rejected, 3);
    assert_eq!(summary.positions, 0);
}

#[test]
fn test_invalid_config_is_refused() {
    let config = AppConfig::parse("[flux]\nticker_capacity = 0").unwrap();
    assert!(Application::new(config).is_err());
}
