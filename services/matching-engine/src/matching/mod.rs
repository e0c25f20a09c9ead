//! Matching logic
//!
//! Crossing detection, the maker-price rule, and the pure matching
//! algorithm that turns an incoming order plus a book into trades and order
//! updates.

pub mod crossing;
pub mod matcher;

pub use matcher::{MatchResult, Matcher};
