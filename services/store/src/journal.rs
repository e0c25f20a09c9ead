//! Journal-backed durable store
//!
//! Every committed transaction is appended to a single journal file as one
//! framed batch before it becomes visible in memory:
//!
//! ```text
//! [payload_len: u32 LE]
//! [payload: bincode Vec<WriteOp>]
//! [checksum: u32 LE]  // CRC32C over payload
//! ```
//!
//! Opening the store replays the journal into fresh tables. A torn trailing
//! frame (crash mid-commit) is discarded and truncated away, which preserves
//! commit atomicity across restarts; a checksum mismatch anywhere before the
//! tail means real corruption and is a hard error.

use crate::memory::{IdAllocator, OpBuffer, Tables, WriteOp};
use crate::{Store, StoreTxn};
use crc32c::crc32c;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use types::errors::StoreError;
use types::ids::{OrderId, Symbol};
use types::numeric::Quantity;
use types::order::{NewOrder, Order, OrderStatus};
use types::trade::{NewTrade, Trade};

const FRAME_OVERHEAD: usize = 8; // 4-byte length prefix + 4-byte checksum

/// Durable store adapter: in-memory tables fronted by an append-only journal.
pub struct JournalStore {
    tables: Mutex<Tables>,
    ids: IdAllocator,
    writer: Mutex<JournalWriter>,
}

impl JournalStore {
    /// Open (or create) a journal at `path` and replay it into memory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let mut tables = Tables::default();
        let mut max_order_id = 0u64;
        let mut max_trade_id = 0u64;
        let mut pos = 0usize;
        let mut batches = 0u64;

        while data.len() - pos >= 4 {
            let payload_len =
                u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap()) as usize;
            if data.len() - pos < FRAME_OVERHEAD + payload_len {
                // Torn tail from a crash mid-append; the batch never
                // committed, so it is discarded below.
                break;
            }

            let payload = &data[pos + 4..pos + 4 + payload_len];
            let stored_checksum = u32::from_le_bytes(
                data[pos + 4 + payload_len..pos + FRAME_OVERHEAD + payload_len]
                    .try_into()
                    .unwrap(),
            );
            if crc32c(payload) != stored_checksum {
                return Err(StoreError::Corrupt(format!(
                    "checksum mismatch at byte {pos}"
                )));
            }

            let ops: Vec<WriteOp> = bincode::deserialize(payload)
                .map_err(|err| StoreError::Corrupt(format!("undecodable batch at byte {pos}: {err}")))?;
            for op in &ops {
                match op {
                    WriteOp::InsertOrder(order) => {
                        max_order_id = max_order_id.max(order.id.as_u64());
                    }
                    WriteOp::InsertTrade(trade) => {
                        max_trade_id = max_trade_id.max(trade.id.as_u64());
                    }
                    WriteOp::UpdateOrder { .. } => {}
                }
            }
            tables
                .check(&ops)
                .map_err(|err| StoreError::Corrupt(format!("inconsistent batch at byte {pos}: {err}")))?;
            tables.apply(ops);

            pos += FRAME_OVERHEAD + payload_len;
            batches += 1;
        }

        if pos < data.len() {
            tracing::warn!(
                path = %path.display(),
                discarded = data.len() - pos,
                "discarding torn journal tail"
            );
            let file = OpenOptions::new().write(true).open(&path)?;
            file.set_len(pos as u64)?;
            file.sync_all()?;
        }

        tracing::info!(path = %path.display(), batches, "journal replayed");

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            tables: Mutex::new(tables),
            ids: IdAllocator::starting_at(max_order_id + 1, max_trade_id + 1),
            writer: Mutex::new(JournalWriter { file }),
        })
    }
}

impl Store for JournalStore {
    fn begin(&self) -> Result<Box<dyn StoreTxn + '_>, StoreError> {
        Ok(Box::new(JournalTxn {
            buf: OpBuffer::new(&self.tables, &self.ids),
            writer: &self.writer,
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

struct JournalWriter {
    file: File,
}

impl JournalWriter {
    /// Append one framed batch and force it to disk.
    fn append_batch(&mut self, ops: &[WriteOp]) -> Result<(), StoreError> {
        let payload =
            bincode::serialize(ops).map_err(|err| StoreError::Serialization(err.to_string()))?;

        let mut frame = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&crc32c(&payload).to_le_bytes());

        self.file.write_all(&frame)?;
        self.file.sync_all()?;
        Ok(())
    }
}

pub struct JournalTxn<'a> {
    buf: OpBuffer<'a>,
    writer: &'a Mutex<JournalWriter>,
}

impl StoreTxn for JournalTxn<'_> {
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
        let writer = self.writer;
        let (tables, ops) = self.buf.into_parts();
        if ops.is_empty() {
            return Ok(());
        }

        // Validate, persist, then apply. The tables lock is held across all
        // three steps so replayed journal order matches in-memory order.
        let mut tables = tables.lock();
        tables.check(&ops)?;
        writer.lock().append_batch(&ops)?;
        tables.apply(ops);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use types::order::Side;
    use types::numeric::Price;

    fn journal_path(dir: &TempDir) -> PathBuf {
        dir.path().join("engine.journal")
    }

    fn new_order(symbol: &str, created_at: i64) -> NewOrder {
        NewOrder {
            client_order_id: None,
            symbol: Symbol::new(symbol),
            side: Side::Sell,
            order_type: types::order::OrderType::Limit,
            price: Some(Price::from_u64(50000)),
            initial_quantity: Quantity::from_str("1.0").unwrap(),
            remaining_quantity: Quantity::from_str("1.0").unwrap(),
            status: OrderStatus::Open,
            created_at,
            updated_at: created_at,
        }
    }

    fn new_trade(buy: u64, sell: u64, executed_at: i64) -> NewTrade {
        NewTrade {
            symbol: Symbol::new("BTCUSD"),
            buy_order_id: OrderId::new(buy),
            sell_order_id: OrderId::new(sell),
            price: Price::from_u64(50000),
            quantity: Quantity::from_str("0.5").unwrap(),
            executed_at,
        }
    }

    #[test]
    fn test_reopen_replays_committed_state() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);

        let (order_id, trade_id) = {
            let store = JournalStore::open(&path).unwrap();
            let mut txn = store.begin().unwrap();
            let order = txn.insert_order(new_order("BTCUSD", 100)).unwrap();
            let trade = txn.insert_trade(new_trade(1, 2, 100)).unwrap();
            txn.update_order(order.id, Quantity::from_str("0.5").unwrap(), OrderStatus::PartiallyFilled, 200)
                .unwrap();
            txn.commit().unwrap();
            (order.id, trade.id)
        };

        let reopened = JournalStore::open(&path).unwrap();
        let order = reopened.get_order(order_id).unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining_quantity, Quantity::from_str("0.5").unwrap());

        let trades = reopened.query_trades(&Symbol::new("BTCUSD"), 0).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].id, trade_id);
    }

    #[test]
    fn test_reopen_continues_id_sequence() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);

        let first_id = {
            let store = JournalStore::open(&path).unwrap();
            let mut txn = store.begin().unwrap();
            let order = txn.insert_order(new_order("BTCUSD", 100)).unwrap();
            txn.commit().unwrap();
            order.id
        };

        let reopened = JournalStore::open(&path).unwrap();
        let mut txn = reopened.begin().unwrap();
        let next = txn.insert_order(new_order("BTCUSD", 200)).unwrap();
        txn.commit().unwrap();
        assert!(next.id > first_id);
    }

    #[test]
    fn test_rolled_back_transaction_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);

        let abandoned = {
            let store = JournalStore::open(&path).unwrap();
            let mut txn = store.begin().unwrap();
            let order = txn.insert_order(new_order("BTCUSD", 100)).unwrap();
            txn.rollback().unwrap();
            order.id
        };

        let reopened = JournalStore::open(&path).unwrap();
        assert!(matches!(
            reopened.get_order(abandoned),
            Err(StoreError::OrderNotFound(_))
        ));
    }

    #[test]
    fn test_torn_tail_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);

        let order_id = {
            let store = JournalStore::open(&path).unwrap();
            let mut txn = store.begin().unwrap();
            let order = txn.insert_order(new_order("BTCUSD", 100)).unwrap();
            txn.commit().unwrap();
            order.id
        };

        // Simulate a crash mid-append: a length prefix promising more bytes
        // than the file holds.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&1000u32.to_le_bytes()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
        drop(file);

        let reopened = JournalStore::open(&path).unwrap();
        assert!(reopened.get_order(order_id).is_ok());

        // The tail was truncated, so appending keeps working.
        let mut txn = reopened.begin().unwrap();
        txn.insert_order(new_order("BTCUSD", 200)).unwrap();
        txn.commit().unwrap();

        let third = JournalStore::open(&path).unwrap();
        assert_eq!(third.active_orders().unwrap().len(), 2);
    }

    #[test]
    fn test_tampered_payload_is_detected() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);

        {
            let store = JournalStore::open(&path).unwrap();
            let mut txn = store.begin().unwrap();
            txn.insert_order(new_order("BTCUSD", 100)).unwrap();
            txn.commit().unwrap();
        }

        // Flip a byte inside the payload of the first frame.
        let mut data = fs::read(&path).unwrap();
        data[6] ^= 0xFF;
        fs::write(&path, &data).unwrap();

        assert!(matches!(
            JournalStore::open(&path),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_empty_commit_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = journal_path(&dir);

        let store = JournalStore::open(&path).unwrap();
        let txn = store.begin().unwrap();
        txn.commit().unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }
}
