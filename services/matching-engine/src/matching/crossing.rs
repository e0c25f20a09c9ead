//! Crossing detection and trade pricing
//!
//! A market taker matches any resting order. A limit taker matches when its
//! price crosses the resting price (buy: taker >= resting, sell: taker <=
//! resting; the comparison is inclusive). The trade always executes at the
//! resting (maker) order's price.

use types::errors::EngineError;
use types::numeric::Price;
use types::order::{Order, OrderType, Side};

/// Check whether the incoming order can match the resting order.
pub fn can_match(incoming: &Order, resting: &Order) -> bool {
    if incoming.order_type == OrderType::Market {
        return true;
    }
    let (Some(incoming_price), Some(resting_price)) = (incoming.price, resting.price) else {
        return false;
    };
    match incoming.side {
        Side::Buy => incoming_price >= resting_price,
        Side::Sell => incoming_price <= resting_price,
    }
}

/// Price at which a match between `incoming` and `resting` executes: the
/// resting order's price. A resting order without a price cannot exist (the
/// book refuses to store one), so that case is an invariant violation.
pub fn trade_price(resting: &Order) -> Result<Price, EngineError> {
    resting.price.ok_or_else(|| {
        EngineError::Fatal(format!("resting order {} has no price", resting.id))
    })
}
