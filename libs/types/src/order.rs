//! Order lifecycle types
//!
//! An order is created through the engine, mutated only by the match that
//! placed it, by later matches that consume it while resting, or by an
//! explicit cancel. Terminal orders are never mutated again.

use crate::ids::{OrderId, Symbol};
use crate::numeric::{Price, Quantity};
use crate::requests::CreateOrderRequest;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Rests in the book at its limit price when not immediately matched.
    Limit,
    /// Matches against whatever is resting; any remainder is canceled.
    Market,
}

/// Order status
///
/// `Filled` and `Canceled` are terminal; an order in either state keeps a
/// zero remaining quantity and never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
    }
}

/// A persisted order row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    pub symbol: Symbol,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Present iff `order_type` is `Limit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// Immutable after insertion.
    pub initial_quantity: Quantity,
    /// Always within `[0, initial_quantity]`.
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl Order {
    /// Check if the order can still participate in matching or be canceled.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Open | OrderStatus::PartiallyFilled
        )
    }
}

/// An order as handed to the store for insertion, before an id exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub client_order_id: Option<String>,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Price>,
    pub initial_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl NewOrder {
    /// Build the initial row for a validated placement request.
    pub fn from_request(req: &CreateOrderRequest, now: i64) -> Self {
        Self {
            client_order_id: req.client_order_id.clone(),
            symbol: req.symbol.clone(),
            side: req.side,
            order_type: req.order_type,
            price: req.price,
            initial_quantity: req.quantity,
            remaining_quantity: req.quantity,
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the store-assigned id.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            client_order_id: self.client_order_id,
            symbol: self.symbol,
            side: self.side,
            order_type: self.order_type,
            price: self.price,
            initial_quantity: self.initial_quantity,
            remaining_quantity: self.remaining_quantity,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::CreateOrderRequest;

    fn limit_request() -> CreateOrderRequest {
        CreateOrderRequest {
            client_order_id: Some("client-1".to_string()),
            symbol: Symbol::new("BTCUSD"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(Price::from_u64(50000)),
            quantity: Quantity::from_str("1.5").unwrap(),
        }
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_status_terminality() {
        assert!(!OrderStatus::Open.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_new_order_from_request() {
        let order = NewOrder::from_request(&limit_request(), 1_708_123_456_789_000_000);

        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.remaining_quantity, order.initial_quantity);
        assert_eq!(order.created_at, order.updated_at);
    }

    #[test]
    fn test_into_order_attaches_id() {
        let order =
            NewOrder::from_request(&limit_request(), 1_708_123_456_789_000_000).into_order(OrderId::new(7));

        assert_eq!(order.id, OrderId::new(7));
        assert!(order.is_active());
    }

    #[test]
    fn test_order_serialization_uses_wire_names() {
        let order =
            NewOrder::from_request(&limit_request(), 1_708_123_456_789_000_000).into_order(OrderId::new(1));

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["side"], "buy");
        assert_eq!(json["type"], "limit");
        assert_eq!(json["status"], "open");
        assert_eq!(json["price"], "50000");

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_market_order_omits_price() {
        let mut order =
            NewOrder::from_request(&limit_request(), 1_708_123_456_789_000_000).into_order(OrderId::new(1));
        order.order_type = OrderType::Market;
        order.price = None;

        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("price").is_none());
    }
}
