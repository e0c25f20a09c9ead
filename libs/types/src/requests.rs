//! Request payloads accepted by the engine
//!
//! Validation lives with the request type so that both the HTTP layer and
//! the engine apply the same rules.

use crate::errors::EngineError;
use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use crate::order::{OrderType, Side};
use serde::{Deserialize, Serialize};

/// Payload for placing a new order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    pub symbol: Symbol,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    pub quantity: Quantity,
}

impl CreateOrderRequest {
    /// Validate the request against the placement rules:
    /// quantity strictly positive, limit orders carry a price, market orders
    /// do not. Symbol non-emptiness and price positivity are enforced by the
    /// `Symbol` and `Price` types themselves.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.quantity.is_zero() {
            return Err(EngineError::Validation(
                "quantity must be positive".to_string(),
            ));
        }
        match self.order_type {
            OrderType::Limit => {
                if self.price.is_none() {
                    return Err(EngineError::Validation(
                        "price is required for limit orders".to_string(),
                    ));
                }
            }
            OrderType::Market => {
                if self.price.is_some() {
                    return Err(EngineError::Validation(
                        "market orders must not carry a price".to_string(),
                    ));
                }
            }
        }
        if let Some(client_order_id) = &self.client_order_id {
            if client_order_id.is_empty() {
                return Err(EngineError::Validation(
                    "client_order_id must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_request() -> CreateOrderRequest {
        CreateOrderRequest {
            client_order_id: None,
            symbol: Symbol::new("BTCUSD"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(Price::from_u64(50000)),
            quantity: Quantity::from_str("1.0").unwrap(),
        }
    }

    #[test]
    fn test_valid_limit_request() {
        assert!(limit_request().validate().is_ok());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut req = limit_request();
        req.quantity = Quantity::zero();
        assert!(matches!(req.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_limit_without_price_rejected() {
        let mut req = limit_request();
        req.price = None;
        assert!(matches!(req.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_market_with_price_rejected() {
        let mut req = limit_request();
        req.order_type = OrderType::Market;
        assert!(matches!(req.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_market_without_price_accepted() {
        let mut req = limit_request();
        req.order_type = OrderType::Market;
        req.price = None;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_client_order_id_rejected() {
        let mut req = limit_request();
        req.client_order_id = Some(String::new());
        assert!(matches!(req.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{
            "symbol": "BTCUSD",
            "side": "sell",
            "type": "limit",
            "price": "50000",
            "quantity": "0.5"
        }"#;

        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.side, Side::Sell);
        assert_eq!(req.order_type, OrderType::Limit);
        assert_eq!(req.price, Some(Price::from_u64(50000)));
        assert!(req.validate().is_ok());
    }
}
