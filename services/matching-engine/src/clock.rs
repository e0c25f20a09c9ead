//! Time injection
//!
//! The engine samples time once per operation through a `Clock` so matching
//! is deterministic under test: every trade and order update produced by one
//! match carries the same timestamp.

use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Current time as Unix nanoseconds.
    fn now_nanos(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as i64
    }
}

/// A clock pinned to a single instant, for tests.
#[derive(Debug)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_nanos(&self) -> i64 {
        self.0
    }
}
