//! Ask (sell-side) order book
//!
//! Price levels sorted so that the best ask is the lowest price, which is
//! the BTreeMap's natural ascending order.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::Price;

use super::price_level::PriceLevel;

#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Append an order id to the level at `price`, creating the level if
    /// needed.
    pub fn insert(&mut self, price: Price, order_id: OrderId) {
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .add(order_id);
    }

    /// Remove an order id from the level at `price`; drops the level when it
    /// becomes empty. Returns true if the order was present.
    pub fn remove(&mut self, order_id: OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id) {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// The level at the best (lowest) ask price.
    pub fn best_level(&self) -> Option<&PriceLevel> {
        self.levels.values().next()
    }

    /// Iterate levels best-first (ascending price).
    pub fn iter(&self) -> impl Iterator<Item = &PriceLevel> + '_ {
        self.levels.values()
    }

    pub fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
