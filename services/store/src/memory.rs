//! In-memory reference store
//!
//! Tables live behind a single mutex; transactions buffer their writes as
//! [`WriteOp`]s and apply them atomically at commit after re-validation.
//! Id allocation is atomic and survives rolled-back transactions, so ids
//! stay unique and monotonic even when a transaction is discarded.

use crate::{Store, StoreTxn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use types::errors::StoreError;
use types::ids::{OrderId, Symbol, TradeId};
use types::numeric::Quantity;
use types::order::{NewOrder, Order, OrderStatus};
use types::trade::{NewTrade, Trade};

/// A single buffered write. Also the journal record format, so the durable
/// adapter replays exactly what the in-memory tables apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum WriteOp {
    InsertOrder(Order),
    InsertTrade(Trade),
    UpdateOrder {
        id: OrderId,
        remaining_quantity: Quantity,
        status: OrderStatus,
        updated_at: i64,
    },
}

/// Committed state: orders and trades keyed for the query paths the engine
/// uses. BTreeMap keeps order iteration deterministic.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    orders: BTreeMap<OrderId, Order>,
    trades: Vec<Trade>,
    client_order_ids: HashSet<String>,
}

impl Tables {
    /// Validate a batch against committed state. Runs before any mutation so
    /// a failing batch leaves the tables untouched.
    pub(crate) fn check(&self, ops: &[WriteOp]) -> Result<(), StoreError> {
        let mut pending_clients: HashSet<&str> = HashSet::new();
        let mut pending_orders: HashSet<OrderId> = HashSet::new();

        for op in ops {
            match op {
                WriteOp::InsertOrder(order) => {
                    if let Some(client_order_id) = &order.client_order_id {
                        if self.client_order_ids.contains(client_order_id)
                            || !pending_clients.insert(client_order_id.as_str())
                        {
                            return Err(StoreError::DuplicateClientOrderId(
                                client_order_id.clone(),
                            ));
                        }
                    }
                    pending_orders.insert(order.id);
                }
                WriteOp::UpdateOrder { id, .. } => {
                    if !self.orders.contains_key(id) && !pending_orders.contains(id) {
                        return Err(StoreError::OrderNotFound(*id));
                    }
                }
                WriteOp::InsertTrade(_) => {}
            }
        }
        Ok(())
    }

    /// Apply a batch previously validated with [`Tables::check`].
    pub(crate) fn apply(&mut self, ops: Vec<WriteOp>) {
        for op in ops {
            match op {
                WriteOp::InsertOrder(order) => {
                    if let Some(client_order_id) = &order.client_order_id {
                        self.client_order_ids.insert(client_order_id.clone());
                    }
                    self.orders.insert(order.id, order);
                }
                WriteOp::InsertTrade(trade) => {
                    self.trades.push(trade);
                }
                WriteOp::UpdateOrder {
                    id,
                    remaining_quantity,
                    status,
                    updated_at,
                } => {
                    if let Some(order) = self.orders.get_mut(&id) {
                        order.remaining_quantity = remaining_quantity;
                        order.status = status;
                        order.updated_at = updated_at;
                    }
                }
            }
        }
    }

    pub(crate) fn get_order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub(crate) fn query_trades(&self, symbol: &Symbol, limit: usize) -> Vec<Trade> {
        let mut trades: Vec<Trade> = self
            .trades
            .iter()
            .filter(|trade| &trade.symbol == symbol)
            .cloned()
            .collect();
        trades.sort_by(|a, b| (b.executed_at, b.id).cmp(&(a.executed_at, a.id)));
        if limit > 0 {
            trades.truncate(limit);
        }
        trades
    }

    pub(crate) fn active_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|order| order.is_active())
            .cloned()
            .collect();
        orders.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        orders
    }
}

/// Monotonic id allocation shared by both adapters.
#[derive(Debug)]
pub(crate) struct IdAllocator {
    next_order: AtomicU64,
    next_trade: AtomicU64,
}

impl IdAllocator {
    pub(crate) fn starting_at(next_order: u64, next_trade: u64) -> Self {
        Self {
            next_order: AtomicU64::new(next_order),
            next_trade: AtomicU64::new(next_trade),
        }
    }

    pub(crate) fn next_order_id(&self) -> OrderId {
        OrderId::new(self.next_order.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn next_trade_id(&self) -> TradeId {
        TradeId::new(self.next_trade.fetch_add(1, Ordering::Relaxed))
    }
}

/// Transaction guts shared by the memory and journal adapters: buffered ops
/// plus the overlay logic for in-transaction reads.
pub(crate) struct OpBuffer<'a> {
    tables: &'a Mutex<Tables>,
    ids: &'a IdAllocator,
    ops: Vec<WriteOp>,
}

impl<'a> OpBuffer<'a> {
    pub(crate) fn new(tables: &'a Mutex<Tables>, ids: &'a IdAllocator) -> Self {
        Self {
            tables,
            ids,
            ops: Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (&'a Mutex<Tables>, Vec<WriteOp>) {
        (self.tables, self.ops)
    }

    pub(crate) fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        if let Some(client_order_id) = &order.client_order_id {
            let committed = self.tables.lock().client_order_ids.contains(client_order_id);
            let pending = self.ops.iter().any(|op| {
                matches!(op, WriteOp::InsertOrder(o)
                    if o.client_order_id.as_deref() == Some(client_order_id.as_str()))
            });
            if committed || pending {
                return Err(StoreError::DuplicateClientOrderId(client_order_id.clone()));
            }
        }

        let row = order.into_order(self.ids.next_order_id());
        self.ops.push(WriteOp::InsertOrder(row.clone()));
        Ok(row)
    }

    pub(crate) fn insert_trade(&mut self, trade: NewTrade) -> Result<Trade, StoreError> {
        let row = trade.into_trade(self.ids.next_trade_id());
        self.ops.push(WriteOp::InsertTrade(row.clone()));
        Ok(row)
    }

    pub(crate) fn update_order(
        &mut self,
        id: OrderId,
        remaining_quantity: Quantity,
        status: OrderStatus,
        updated_at: i64,
    ) -> Result<(), StoreError> {
        // The target must be visible to this transaction.
        self.get_order(id)?;
        self.ops.push(WriteOp::UpdateOrder {
            id,
            remaining_quantity,
            status,
            updated_at,
        });
        Ok(())
    }

    pub(crate) fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        let mut current = self.tables.lock().get_order(id).cloned();
        for op in &self.ops {
            match op {
                WriteOp::InsertOrder(order) if order.id == id => {
                    current = Some(order.clone());
                }
                WriteOp::UpdateOrder {
                    id: target,
                    remaining_quantity,
                    status,
                    updated_at,
                } if *target == id => {
                    if let Some(order) = current.as_mut() {
                        order.remaining_quantity = *remaining_quantity;
                        order.status = *status;
                        order.updated_at = *updated_at;
                    }
                }
                _ => {}
            }
        }
        current.ok_or(StoreError::OrderNotFound(id))
    }
}

/// Volatile reference adapter. Everything is lost on drop; durability comes
/// from [`crate::JournalStore`].
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    ids: IdAllocator,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            ids: IdAllocator::starting_at(1, 1),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn begin(&self) -> Result<Box<dyn StoreTxn + '_>, StoreError> {
        Ok(Box::new(MemoryTxn {
            buf: OpBuffer::new(&self.tables, &self.ids),
        }))
    }

    fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.tables
            .lock()
            .get_order(id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(id))
    }

    fn query_trades(&self, symbol: &Symbol, limit: usize) -> Result<Vec<Trade>, StoreError> {
        Ok(self.tables.lock().query_trades(symbol, limit))
    }

    fn active_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.tables.lock().active_orders())
    }
}

pub struct MemoryTxn<'a> {
    buf: OpBuffer<'a>,
}

impl StoreTxn for MemoryTxn<'_> {
    fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        self.buf.insert_order(order)
    }

    fn insert_trade(&mut self, trade: NewTrade) -> Result<Trade, StoreError> {
        self.buf.insert_trade(trade)
    }

    fn update_order(
        &mut self,
        id: OrderId,
        remaining_quantity: Quantity,
        status: OrderStatus,
        updated_at: i64,
    ) -> Result<(), StoreError> {
        self.buf.update_order(id, remaining_quantity, status, updated_at)
    }

    fn get_order(&mut self, id: OrderId) -> Result<Order, StoreError> {
        self.buf.get_order(id)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let (tables, ops) = self.buf.into_parts();
        let mut tables = tables.lock();
        tables.check(&ops)?;
        tables.apply(ops);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // Buffered ops are simply dropped.
        Ok(())
    }
}
