//! Lowest / highest / latest price tracking for open positions.

use poslife_core::Price;

use crate::position::Position;

/// What a ticker changed on a position's price extremes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceExtremesDelta {
    /// First ticker seen since the position was opened.
    pub first_observation: bool,
    pub lowest_changed: bool,
    pub highest_changed: bool,
    /// New latest price (always written).
    pub latest: Price,
}

/// Record `price` on `position`.
///
/// Returns `None` when the position is not OPENED or CLOSING; such
/// observations have no effect. Callers are responsible for only passing
/// tickers of the position's own currency pair.
pub fn observe(position: &mut Position, price: Price) -> Option<PriceExtremesDelta> {
    if !position.status().tracks_prices() {
        return None;
    }

    let (Some(lowest), Some(highest)) = (position.lowest_price, position.highest_price) else {
        position.lowest_price = Some(price);
        position.highest_price = Some(price);
        position.latest_price = Some(price);
        return Some(PriceExtremesDelta {
            first_observation: true,
            lowest_changed: true,
            highest_changed: true,
            latest: price,
        });
    };

    let lowest_changed = price < lowest;
    let highest_changed = price > highest;
    if lowest_changed {
        position.lowest_price = Some(price);
    }
    if highest_changed {
        position.highest_price = Some(price);
    }
    position.latest_price = Some(price);

    Some(PriceExtremesDelta {
        first_observation: false,
        lowest_changed,
        highest_changed,
        latest: price,
    })
}
