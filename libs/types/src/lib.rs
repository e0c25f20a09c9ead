//! Shared domain types for the matching engine
//!
//! Identifier newtypes, exact decimal prices and quantities, order and trade
//! records, request payloads, and the error taxonomy used across services.

pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod requests;
pub mod trade;
