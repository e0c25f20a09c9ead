//! Response payloads for the HTTP surface.

use serde::{Deserialize, Serialize};
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::OrderStatus;
use types::trade::Trade;

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub trades: Vec<Trade>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TradeResponse {
    pub trades: Vec<Trade>,
}

/// A single aggregated price level.
#[derive(Debug, Serialize)]
pub struct OrderBookLevel {
    pub price: Price,
    pub quantity: Quantity,
}

#[derive(Debug, Serialize)]
pub struct OrderBookResponse {
    pub symbol: Symbol,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub symbol: Symbol,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct OrderBookQuery {
    pub symbol: Symbol,
    pub depth: Option<usize>,
}
