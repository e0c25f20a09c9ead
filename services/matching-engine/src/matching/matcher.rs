//! Price-time priority matching
//!
//! `Matcher::match_order` is a pure function over an incoming order and a
//! read-only book: it performs no I/O and never mutates the book. The caller
//! persists the result and applies it to the book afterwards, so a failed
//! commit leaves the book exactly as the matcher saw it.

use crate::book::OrderBook;
use crate::matching::crossing;
use types::errors::EngineError;
use types::numeric::Quantity;
use types::order::{Order, OrderStatus, OrderType, Side};
use types::trade::NewTrade;

/// Outcome of matching one incoming order.
///
/// `updated_orders` holds exactly one entry per touched resting order with
/// its final post-match state, plus the incoming order itself when it ended
/// terminal (filled, or canceled as a market remainder). A limit order with
/// quantity left over comes back in `incoming_leftover` instead; attaching
/// it to the book is the caller's job.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub trades: Vec<NewTrade>,
    pub updated_orders: Vec<Order>,
    pub incoming_leftover: Option<Order>,
}

/// The matching algorithm. Stateless; all inputs are explicit.
#[derive(Debug, Default)]
pub struct Matcher;

impl Matcher {
    pub fn new() -> Self {
        Self
    }

    /// Match `incoming` against `book`.
    ///
    /// `executed_at` is sampled once by the caller; every trade and update
    /// produced by this invocation carries it.
    pub fn match_order(
        &self,
        incoming: &Order,
        book: &OrderBook,
        executed_at: i64,
    ) -> Result<MatchResult, EngineError> {
        let mut result = MatchResult {
            trades: Vec::new(),
            updated_orders: Vec::new(),
            incoming_leftover: None,
        };

        // Work on a copy so the caller keeps the pre-match row for rollback.
        let mut working = incoming.clone();

        match working.side {
            Side::Buy => self.match_buy(&mut working, book, &mut result, executed_at)?,
            Side::Sell => self.match_sell(&mut working, book, &mut result, executed_at)?,
        }

        // Finalize the incoming order from its remaining quantity and type.
        if !working.remaining_quantity.is_zero() {
            if working.order_type == OrderType::Limit {
                if working.remaining_quantity < working.initial_quantity {
                    working.status = OrderStatus::PartiallyFilled;
                    working.updated_at = executed_at;
                }
                result.incoming_leftover = Some(working);
            } else {
                // Market remainder: nothing left to match against, cancel it.
                working.status = OrderStatus::Canceled;
                working.remaining_quantity = Quantity::zero();
                working.updated_at = executed_at;
                result.updated_orders.push(working);
            }
        } else {
            working.status = OrderStatus::Filled;
            working.updated_at = executed_at;
            result.updated_orders.push(working);
        }

        Ok(result)
    }

    /// Consume asks best-price-first, FIFO within a level.
    fn match_buy(
        &self,
        taker: &mut Order,
        book: &OrderBook,
        result: &mut MatchResult,
        executed_at: i64,
    ) -> Result<(), EngineError> {
        'levels: for level in book.ask_levels() {
            for maker_id in level.iter() {
                if taker.remaining_quantity.is_zero() {
                    break 'levels;
                }
                let maker = book.order(maker_id).ok_or_else(|| {
                    EngineError::Fatal(format!("book level references missing order {maker_id}"))
                })?;
                if !crossing::can_match(taker, maker) {
                    break 'levels;
                }
                self.fill(taker, maker, result, executed_at)?;
            }
        }
        Ok(())
    }

    /// Consume bids best-price-first, FIFO within a level.
    fn match_sell(
        &self,
        taker: &mut Order,
        book: &OrderBook,
        result: &mut MatchResult,
        executed_at: i64,
    ) -> Result<(), EngineError> {
        'levels: for level in book.bid_levels() {
            for maker_id in level.iter() {
                if taker.remaining_quantity.is_zero() {
                    break 'levels;
                }
                let maker = book.order(maker_id).ok_or_else(|| {
                    EngineError::Fatal(format!("book level references missing order {maker_id}"))
                })?;
                if !crossing::can_match(taker, maker) {
                    break 'levels;
                }
                self.fill(taker, maker, result, executed_at)?;
            }
        }
        Ok(())
    }

    /// Execute one fill between the taker and a resting maker.
    fn fill(
        &self,
        taker: &mut Order,
        maker: &Order,
        result: &mut MatchResult,
        executed_at: i64,
    ) -> Result<(), EngineError> {
        let quantity = taker.remaining_quantity.min(maker.remaining_quantity);
        let price = crossing::trade_price(maker)?;

        let (buy_order_id, sell_order_id) = match taker.side {
            Side::Buy => (taker.id, maker.id),
            Side::Sell => (maker.id, taker.id),
        };
        result.trades.push(NewTrade {
            symbol: taker.symbol.clone(),
            buy_order_id,
            sell_order_id,
            price,
            quantity,
            executed_at,
        });

        taker.remaining_quantity = taker.remaining_quantity - quantity;

        let mut updated = maker.clone();
        updated.remaining_quantity = updated.remaining_quantity - quantity;
        updated.status = if updated.remaining_quantity.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        updated.updated_at = executed_at;
        result.updated_orders.push(updated);

        Ok(())
    }
}
