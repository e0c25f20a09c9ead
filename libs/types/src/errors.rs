//! Error types for the matching engine
//!
//! Engine errors map one-to-one onto caller-visible outcomes; store errors
//! describe persistence failures and are wrapped by the engine.

use crate::ids::OrderId;
use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed request; nothing was persisted.
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced order does not exist.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// Cancel target is terminal or has no remaining quantity.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence failure; the transaction was rolled back and the book is
    /// unchanged.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invariant violation after commit. In-memory state is untrusted; the
    /// process should restart and recover from the store.
    #[error("invariant violation: {0}")]
    Fatal(String),
}

/// Persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("duplicate client order id: {0}")]
    DuplicateClientOrderId(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt journal: {0}")]
    Corrupt(String),
}
