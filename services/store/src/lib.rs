//! Durable order and trade storage
//!
//! The engine talks to persistence through the [`Store`] and [`StoreTxn`]
//! traits only. Two adapters are provided: a volatile in-memory store for
//! tests and ephemeral deployments, and a journal-backed store that replays
//! an append-only, checksummed log on open.

pub mod journal;
pub mod memory;

pub use journal::JournalStore;
pub use memory::MemoryStore;

use types::errors::StoreError;
use types::ids::{OrderId, Symbol};
use types::numeric::Quantity;
use types::order::{NewOrder, Order, OrderStatus};
use types::trade::{NewTrade, Trade};

/// Abstract persistence surface.
///
/// Implementations must be safe for concurrent independent transactions and
/// provide read-committed isolation or stronger: reads through a transaction
/// observe committed state plus that transaction's own buffered writes.
pub trait Store: Send + Sync {
    /// Open a buffered transaction. Dropping the transaction without
    /// committing rolls it back.
    fn begin(&self) -> Result<Box<dyn StoreTxn + '_>, StoreError>;

    /// Fetch an order by id from committed state.
    fn get_order(&self, id: OrderId) -> Result<Order, StoreError>;

    /// Trades for a symbol ordered by `(executed_at, id)` descending.
    /// A `limit` of zero means unbounded.
    fn query_trades(&self, symbol: &Symbol, limit: usize) -> Result<Vec<Trade>, StoreError>;

    /// Orders with status open or partially filled, ordered by
    /// `(created_at, id)` ascending so recovery preserves time priority.
    fn active_orders(&self) -> Result<Vec<Order>, StoreError>;
}

/// A single store transaction.
///
/// Writes are buffered and validated at commit; either every buffered write
/// becomes visible or none do.
pub trait StoreTxn: Send {
    /// Insert a new order and return the row with its assigned id.
    fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError>;

    /// Insert a new trade and return the row with its assigned id.
    fn insert_trade(&mut self, trade: NewTrade) -> Result<Trade, StoreError>;

    /// Update an order's remaining quantity, status, and update timestamp.
    fn update_order(
        &mut self,
        id: OrderId,
        remaining_quantity: Quantity,
        status: OrderStatus,
        updated_at: i64,
    ) -> Result<(), StoreError>;

    /// Fetch an order as this transaction sees it (committed state overlaid
    /// with this transaction's buffered writes).
    fn get_order(&mut self, id: OrderId) -> Result<Order, StoreError>;

    /// Atomically apply all buffered writes.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard all buffered writes.
    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
