//! Per-symbol order book
//!
//! The book owns its resting orders in an arena keyed by order id; the bid
//! and ask sides only store ids, so there is exactly one copy of every
//! resting order and removal from the middle of a level is id-based.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::PriceLevel;

use std::collections::HashMap;
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// Two-sided book for a single symbol.
///
/// A resting order always has a price, remaining quantity above zero, and an
/// open or partially filled status; market orders are never stored.
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,
    orders: HashMap<OrderId, Order>,
    bids: BidBook,
    asks: AskBook,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            orders: HashMap::new(),
            bids: BidBook::new(),
            asks: AskBook::new(),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Insert a limit order. Orders without a price (market orders) are not
    /// stored.
    pub fn add(&mut self, order: Order) {
        let Some(price) = order.price else {
            return;
        };
        match order.side {
            Side::Buy => self.bids.insert(price, order.id),
            Side::Sell => self.asks.insert(price, order.id),
        }
        self.orders.insert(order.id, order);
    }

    /// Remove an order by id, side, and price. Returns true if it was
    /// resting in the book.
    pub fn remove(&mut self, order_id: OrderId, side: Side, price: Price) -> bool {
        let removed = match side {
            Side::Buy => self.bids.remove(order_id, price),
            Side::Sell => self.asks.remove(order_id, price),
        };
        if removed {
            self.orders.remove(&order_id);
        }
        removed
    }

    /// Look up a resting order.
    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// The oldest order at the highest bid price.
    pub fn best_bid(&self) -> Option<&Order> {
        self.bids
            .best_level()
            .and_then(|level| level.front())
            .and_then(|id| self.orders.get(&id))
    }

    /// The oldest order at the lowest ask price.
    pub fn best_ask(&self) -> Option<&Order> {
        self.asks
            .best_level()
            .and_then(|level| level.front())
            .and_then(|id| self.orders.get(&id))
    }

    /// Iterate bid levels best-first (descending price).
    pub fn bid_levels(&self) -> impl Iterator<Item = &PriceLevel> + '_ {
        self.bids.iter()
    }

    /// Iterate ask levels best-first (ascending price).
    pub fn ask_levels(&self) -> impl Iterator<Item = &PriceLevel> + '_ {
        self.asks.iter()
    }

    /// Reflect a committed post-match update: shrink the order's remaining
    /// quantity in place, or remove it entirely once it is filled.
    /// Returns false if the order is not resting in the book.
    pub fn apply_update(&mut self, update: &Order) -> bool {
        if update.remaining_quantity.is_zero() {
            let Some((side, price)) = self
                .orders
                .get(&update.id)
                .map(|order| (order.side, order.price))
            else {
                return false;
            };
            match price {
                Some(price) => self.remove(update.id, side, price),
                None => false,
            }
        } else {
            match self.orders.get_mut(&update.id) {
                Some(existing) => {
                    existing.remaining_quantity = update.remaining_quantity;
                    existing.status = update.status;
                    existing.updated_at = update.updated_at;
                    true
                }
                None => false,
            }
        }
    }

    /// Aggregated top `depth` levels per side: bids descending, asks
    /// ascending, each with the level's total remaining quantity.
    pub fn top_levels(&self, depth: usize) -> (Vec<(Price, Quantity)>, Vec<(Price, Quantity)>) {
        let bids = self
            .bids
            .iter()
            .take(depth)
            .map(|level| (level.price(), level.total_quantity(&self.orders)))
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|level| (level.price(), level.total_quantity(&self.orders)))
            .collect();
        (bids, asks)
    }

    /// Total remaining quantity resting at one side and price; zero when the
    /// level does not exist.
    pub fn level_total_quantity(&self, side: Side, price: Price) -> Quantity {
        let level = match side {
            Side::Buy => self.bids.level(price),
            Side::Sell => self.asks.level(price),
        };
        level
            .map(|level| level.total_quantity(&self.orders))
            .unwrap_or_else(Quantity::zero)
    }

    /// Number of resting orders across both sides.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::order::{OrderStatus, OrderType};

    fn limit_order(id: u64, side: Side, price: u64, qty: &str, created_at: i64) -> Order {
        Order {
            id: OrderId::new(id),
            client_order_id: None,
            symbol: Symbol::new("BTCUSD"),
            side,
            order_type: OrderType::Limit,
            price: Some(Price::from_u64(price)),
            initial_quantity: Quantity::from_str(qty).unwrap(),
            remaining_quantity: Quantity::from_str(qty).unwrap(),
            status: OrderStatus::Open,
            created_at,
            updated_at: created_at,
        }
    }

    fn market_order(id: u64, side: Side, qty: &str) -> Order {
        Order {
            id: OrderId::new(id),
            client_order_id: None,
            symbol: Symbol::new("BTCUSD"),
            side,
            order_type: OrderType::Market,
            price: None,
            initial_quantity: Quantity::from_str(qty).unwrap(),
            remaining_quantity: Quantity::from_str(qty).unwrap(),
            status: OrderStatus::Open,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_add_and_best_per_side() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        book.add(limit_order(1, Side::Buy, 50000, "1.0", 1));
        book.add(limit_order(2, Side::Buy, 50100, "0.5", 2));
        book.add(limit_order(3, Side::Sell, 50300, "1.0", 3));
        book.add(limit_order(4, Side::Sell, 50200, "2.0", 4));

        assert_eq!(book.best_bid().unwrap().id, OrderId::new(2));
        assert_eq!(book.best_ask().unwrap().id, OrderId::new(4));
    }

    #[test]
    fn test_market_order_is_not_stored() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        book.add(market_order(1, Side::Buy, "1.0"));
        assert!(book.is_empty());
    }

    #[test]
    fn test_best_bid_below_best_ask() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        book.add(limit_order(1, Side::Buy, 49900, "1.0", 1));
        book.add(limit_order(2, Side::Sell, 50100, "1.0", 2));

        let bid = book.best_bid().unwrap().price.unwrap();
        let ask = book.best_ask().unwrap().price.unwrap();
        assert!(bid < ask);
    }

    #[test]
    fn test_fifo_within_level() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        book.add(limit_order(1, Side::Sell, 50000, "0.5", 1));
        book.add(limit_order(2, Side::Sell, 50000, "0.5", 2));

        assert_eq!(book.best_ask().unwrap().id, OrderId::new(1));
        assert!(book.remove(OrderId::new(1), Side::Sell, Price::from_u64(50000)));
        assert_eq!(book.best_ask().unwrap().id, OrderId::new(2));
    }

    #[test]
    fn test_remove_clears_arena() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        book.add(limit_order(1, Side::Buy, 50000, "1.0", 1));

        assert!(book.remove(OrderId::new(1), Side::Buy, Price::from_u64(50000)));
        assert!(book.order(OrderId::new(1)).is_none());
        assert!(book.is_empty());

        // Second removal is a no-op.
        assert!(!book.remove(OrderId::new(1), Side::Buy, Price::from_u64(50000)));
    }

    #[test]
    fn test_apply_update_partial_fill() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        book.add(limit_order(1, Side::Sell, 50000, "1.0", 1));

        let mut update = limit_order(1, Side::Sell, 50000, "1.0", 1);
        update.remaining_quantity = Quantity::from_str("0.4").unwrap();
        update.status = OrderStatus::PartiallyFilled;
        update.updated_at = 9;

        assert!(book.apply_update(&update));
        let resting = book.order(OrderId::new(1)).unwrap();
        assert_eq!(
            resting.remaining_quantity,
            Quantity::from_str("0.4").unwrap()
        );
        assert_eq!(resting.status, OrderStatus::PartiallyFilled);
    }

    #[test]
    fn test_apply_update_full_fill_removes_order() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        book.add(limit_order(1, Side::Sell, 50000, "1.0", 1));

        let mut update = limit_order(1, Side::Sell, 50000, "1.0", 1);
        update.remaining_quantity = Quantity::zero();
        update.status = OrderStatus::Filled;

        assert!(book.apply_update(&update));
        assert!(book.is_empty());
    }

    #[test]
    fn test_apply_update_unknown_order() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        let update = limit_order(42, Side::Sell, 50000, "1.0", 1);
        assert!(!book.apply_update(&update));
    }

    #[test]
    fn test_top_levels_aggregates_quantities() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        book.add(limit_order(1, Side::Buy, 50000, "1.0", 1));
        book.add(limit_order(2, Side::Buy, 50000, "2.0", 2));
        book.add(limit_order(3, Side::Buy, 49900, "1.5", 3));
        book.add(limit_order(4, Side::Sell, 50100, "0.5", 4));

        let (bids, asks) = book.top_levels(2);
        assert_eq!(bids.len(), 2);
        assert_eq!(
            bids[0],
            (Price::from_u64(50000), Quantity::from_str("3.0").unwrap())
        );
        assert_eq!(
            bids[1],
            (Price::from_u64(49900), Quantity::from_str("1.5").unwrap())
        );
        assert_eq!(asks.len(), 1);
        assert_eq!(
            asks[0],
            (Price::from_u64(50100), Quantity::from_str("0.5").unwrap())
        );
    }

    #[test]
    fn test_top_levels_respects_depth() {
        let mut book = OrderBook::new(Symbol::new("BTCUSD"));
        for (id, price) in [(1, 50000), (2, 49900), (3, 49800), (4, 49700)] {
            book.add(limit_order(id, Side::Buy, price, "1.0", id as i64));
        }

        let (bids, _) = book.top_levels(2);
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].0, Price::from_u64(50000));
        assert_eq!(bids[1].0, Price::from_u64(49900));
    }

    #[test]
    fn test_level_total_quantity_missing_level_is_zero() {
        let book = OrderBook::new(Symbol::new("BTCUSD"));
        assert!(book
            .level_total_quantity(Side::Buy, Price::from_u64(50000))
            .is_zero());
    }
}
