//! Price level with FIFO queue
//!
//! A price level holds the ids of all resting orders at one exact price,
//! oldest first. Order data itself lives in the book's arena; the level only
//! encodes time priority.

use std::collections::VecDeque;
use std::collections::HashMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Order;

/// FIFO queue of order ids at a single price.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Price,
    orders: VecDeque<OrderId>,
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// Append an order at the back of the queue (time priority).
    pub fn add(&mut self, order_id: OrderId) {
        self.orders.push_back(order_id);
    }

    /// Remove an order by id, preserving the relative order of the rest.
    /// Returns true if the order was present.
    pub fn remove(&mut self, order_id: OrderId) -> bool {
        match self.orders.iter().position(|id| *id == order_id) {
            Some(index) => {
                self.orders.remove(index);
                true
            }
            None => false,
        }
    }

    /// The oldest order at this price.
    pub fn front(&self) -> Option<OrderId> {
        self.orders.front().copied()
    }

    /// Iterate order ids oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = OrderId> + '_ {
        self.orders.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Sum of remaining quantities over the contained orders, looked up in
    /// the book's arena.
    pub fn total_quantity(&self, orders: &HashMap<OrderId, Order>) -> Quantity {
        self.orders
            .iter()
            .filter_map(|id| orders.get(id))
            .fold(Quantity::zero(), |total, order| {
                total + order.remaining_quantity
            })
    }
}
