//! Correlation id generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic source of call ids.
///
/// The first id handed out is 1; 0 is reserved for frames that carry no
/// routable correlation id.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a generator whose first id is `first` (clamped to 1).
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.max(1)),
        }
    }

    /// Returns the next id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
