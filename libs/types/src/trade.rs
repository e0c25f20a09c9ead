//! Trade types
//!
//! A trade records one execution between a buy and a sell order on the same
//! symbol. Once written it is immutable; its price is always the resting
//! (maker) order's price.

use crate::ids::{OrderId, Symbol, TradeId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// A persisted trade row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub symbol: Symbol,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    pub executed_at: i64, // Unix nanos
}

/// A trade as produced by the matcher, before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub symbol: Symbol,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    pub executed_at: i64, // Unix nanos
}

impl NewTrade {
    /// Attach the store-assigned id.
    pub fn into_trade(self, id: TradeId) -> Trade {
        Trade {
            id,
            symbol: self.symbol,
            buy_order_id: self.buy_order_id,
            sell_order_id: self.sell_order_id,
            price: self.price,
            quantity: self.quantity,
            executed_at: self.executed_at,
        }
    }
}
