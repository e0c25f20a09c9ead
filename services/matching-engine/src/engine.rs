//! Engine: symbol-scoped orchestration
//!
//! Placement and cancellation serialize per symbol behind a dedicated lock,
//! run inside one store transaction, and touch the in-memory book only after
//! that transaction commits. Recovery rebuilds the books from the store's
//! active orders in `(created_at, id)` order, which preserves time priority
//! within every price level.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::book::OrderBook;
use crate::clock::{Clock, SystemClock};
use crate::matching::{MatchResult, Matcher};
use store::{Store, StoreTxn};
use types::errors::{EngineError, StoreError};
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{NewOrder, Order, OrderStatus, OrderType};
use types::requests::CreateOrderRequest;
use types::trade::Trade;

/// Upper bound on the depth a book snapshot may request.
pub const MAX_BOOK_DEPTH: usize = 100;

/// The matching engine.
///
/// Symbol locks and books are created lazily under a coarse reader-writer
/// lock and never removed for the engine's lifetime.
pub struct Engine {
    store: Arc<dyn Store>,
    matcher: Matcher,
    books: RwLock<HashMap<Symbol, Arc<RwLock<OrderBook>>>>,
    symbol_locks: RwLock<HashMap<Symbol, Arc<Mutex<()>>>>,
    clock: Arc<dyn Clock>,
}

struct StagedPlacement {
    order: Order,
    trades: Vec<Trade>,
    result: MatchResult,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            matcher: Matcher::new(),
            books: RwLock::new(HashMap::new()),
            symbol_locks: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Per-symbol exclusive lock, created on first use.
    fn symbol_lock(&self, symbol: &Symbol) -> Arc<Mutex<()>> {
        if let Some(lock) = self.symbol_locks.read().get(symbol) {
            return lock.clone();
        }
        let mut locks = self.symbol_locks.write();
        locks
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Per-symbol book, created on first use.
    fn book(&self, symbol: &Symbol) -> Arc<RwLock<OrderBook>> {
        if let Some(book) = self.books.read().get(symbol) {
            return book.clone();
        }
        let mut books = self.books.write();
        books
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(RwLock::new(OrderBook::new(symbol.clone()))))
            .clone()
    }

    /// Place an order: persist it, match it against the symbol's book, and
    /// persist every resulting trade and order update in one transaction.
    ///
    /// The book is mutated only after the commit succeeds, so a store
    /// failure leaves memory and disk consistent and the placement can
    /// simply be retried.
    pub fn place_order(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<(Order, Vec<Trade>), EngineError> {
        req.validate()?;

        let lock = self.symbol_lock(&req.symbol);
        let _symbol_guard = lock.lock();

        let book_handle = self.book(&req.symbol);
        let now = self.clock.now_nanos();

        let mut txn = self.store.begin()?;
        let staged = match self.stage_placement(txn.as_mut(), &book_handle, req, now) {
            Ok(staged) => staged,
            Err(err) => {
                let _ = txn.rollback();
                return Err(err);
            }
        };
        txn.commit()?;

        // The result is committed; reflect it in the book.
        {
            let mut book = book_handle.write();
            for update in &staged.result.updated_orders {
                if update.id == staged.order.id {
                    continue;
                }
                if !book.apply_update(update) {
                    return Err(EngineError::Fatal(format!(
                        "committed update for order {} has no resting counterpart",
                        update.id
                    )));
                }
            }
            if let Some(leftover) = &staged.result.incoming_leftover {
                book.add(leftover.clone());
            }
        }

        tracing::debug!(
            order_id = %staged.order.id,
            symbol = %staged.order.symbol,
            status = ?staged.order.status,
            trades = staged.trades.len(),
            "order placed"
        );
        Ok((staged.order, staged.trades))
    }

    /// Everything between `begin` and `commit`: insert the order, run the
    /// matcher over a read-locked book, and buffer trades and updates.
    fn stage_placement(
        &self,
        txn: &mut (dyn StoreTxn + '_),
        book_handle: &Arc<RwLock<OrderBook>>,
        req: &CreateOrderRequest,
        now: i64,
    ) -> Result<StagedPlacement, EngineError> {
        let inserted = txn
            .insert_order(NewOrder::from_request(req, now))
            .map_err(|err| match err {
                StoreError::DuplicateClientOrderId(id) => {
                    EngineError::Validation(format!("client_order_id {id} already in use"))
                }
                other => EngineError::Store(other),
            })?;

        let result = {
            let book = book_handle.read();
            self.matcher.match_order(&inserted, &book, now)?
        };

        let mut trades = Vec::with_capacity(result.trades.len());
        for new_trade in &result.trades {
            trades.push(txn.insert_trade(new_trade.clone())?);
        }
        for update in &result.updated_orders {
            txn.update_order(
                update.id,
                update.remaining_quantity,
                update.status,
                update.updated_at,
            )?;
        }

        let order = if let Some(leftover) = &result.incoming_leftover {
            // A partially filled leftover differs from the inserted row;
            // persist its reduced quantity so reads and recovery agree.
            if leftover.remaining_quantity < leftover.initial_quantity {
                txn.update_order(
                    leftover.id,
                    leftover.remaining_quantity,
                    leftover.status,
                    leftover.updated_at,
                )?;
            }
            leftover.clone()
        } else {
            result
                .updated_orders
                .iter()
                .find(|order| order.id == inserted.id)
                .cloned()
                .ok_or_else(|| {
                    EngineError::Fatal(format!(
                        "match result lost incoming order {}",
                        inserted.id
                    ))
                })?
        };

        Ok(StagedPlacement {
            order,
            trades,
            result,
        })
    }

    /// Cancel an open or partially filled order.
    ///
    /// The order is re-read through the transaction after the symbol lock is
    /// held, closing the race with a concurrent fill between the first read
    /// and the lock acquisition.
    pub fn cancel_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        // First read runs outside any lock, only to learn the symbol and
        // reject obviously terminal orders early.
        let current = self.store.get_order(order_id).map_err(Self::map_missing)?;
        Self::ensure_cancelable(&current)?;

        let lock = self.symbol_lock(&current.symbol);
        let _symbol_guard = lock.lock();
        let now = self.clock.now_nanos();

        let mut txn = self.store.begin()?;
        let fresh = match Self::stage_cancel(txn.as_mut(), order_id, now) {
            Ok(order) => order,
            Err(err) => {
                let _ = txn.rollback();
                return Err(err);
            }
        };
        txn.commit()?;

        // Remove from the in-memory book if present; a miss is tolerated.
        if let Some(price) = fresh.price {
            let book_handle = self.book(&fresh.symbol);
            book_handle.write().remove(order_id, fresh.side, price);
        }

        tracing::debug!(order_id = %order_id, symbol = %fresh.symbol, "order canceled");

        let mut canceled = fresh;
        canceled.remaining_quantity = Quantity::zero();
        canceled.status = OrderStatus::Canceled;
        canceled.updated_at = now;
        Ok(canceled)
    }

    fn stage_cancel(
        txn: &mut (dyn StoreTxn + '_),
        order_id: OrderId,
        now: i64,
    ) -> Result<Order, EngineError> {
        let fresh = txn.get_order(order_id).map_err(Self::map_missing)?;
        Self::ensure_cancelable(&fresh)?;
        txn.update_order(order_id, Quantity::zero(), OrderStatus::Canceled, now)?;
        Ok(fresh)
    }

    fn ensure_cancelable(order: &Order) -> Result<(), EngineError> {
        match order.status {
            OrderStatus::Filled => Err(EngineError::Conflict("order already filled".to_string())),
            OrderStatus::Canceled => {
                Err(EngineError::Conflict("order already canceled".to_string()))
            }
            _ if order.remaining_quantity.is_zero() => Err(EngineError::Conflict(
                "order has no remaining quantity".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Rebuild the in-memory books from the store. Called once at startup;
    /// returns the number of orders loaded.
    pub fn recover(&self) -> Result<usize, EngineError> {
        let mut loaded = 0usize;
        for order in self.store.active_orders()? {
            if order.order_type != OrderType::Limit || order.price.is_none() {
                continue;
            }
            let book_handle = self.book(&order.symbol);
            book_handle.write().add(order);
            loaded += 1;
        }
        tracing::info!(loaded, "restored resting orders into order books");
        Ok(loaded)
    }

    /// Fetch an order by id.
    pub fn get_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.store.get_order(order_id).map_err(Self::map_missing)
    }

    /// Recent trades for a symbol, newest first. A `limit` of zero means
    /// unbounded.
    pub fn get_trades(&self, symbol: &Symbol, limit: usize) -> Result<Vec<Trade>, EngineError> {
        Ok(self.store.query_trades(symbol, limit)?)
    }

    /// Aggregated top-of-book: up to `depth` levels per side with total
    /// resting quantity. `depth` must be in `1..=MAX_BOOK_DEPTH`.
    pub fn top_of_book(
        &self,
        symbol: &Symbol,
        depth: usize,
    ) -> Result<(Vec<(Price, Quantity)>, Vec<(Price, Quantity)>), EngineError> {
        if depth == 0 || depth > MAX_BOOK_DEPTH {
            return Err(EngineError::Validation(format!(
                "depth must be between 1 and {MAX_BOOK_DEPTH}"
            )));
        }
        let book_handle = self.book(symbol);
        let book = book_handle.read();
        Ok(book.top_levels(depth))
    }

    fn map_missing(err: StoreError) -> EngineError {
        match err {
            StoreError::OrderNotFound(id) => EngineError::NotFound(id),
            other => EngineError::Store(other),
        }
    }
}
