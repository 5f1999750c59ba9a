//! Message id generator
//!
//! A single hub-wide counter. The first issued id is 1.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic message id source
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Increment the counter and return the new value
    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last issued id (0 if none yet)
    pub fn last_issued(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}
