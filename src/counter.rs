//! Thread-safe counter with a high-water mark.

use std::sync::atomic::{AtomicI64, Ordering};

/// A concurrent counter tracking its current value and the highest value it
/// has ever reached. Useful for tracking in-flight work alongside its peak.
#[derive(Debug, Default)]
pub struct Counter {
    current: AtomicI64,
    max: AtomicI64,
}

impl Counter {
    /// Create a counter with both values at zero.
    pub fn new() -> Counter {
        Counter::default()
    }

    /// Increment and return the new current value, updating the high-water
    /// mark if it was exceeded.
    pub fn inc(&self) -> i64 {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(current, Ordering::SeqCst);
        current
    }

    /// Decrement and return the new current value. May go negative; the
    /// high-water mark is unaffected.
    pub fn dec(&self) -> i64 {
        self.current.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// The current value.
    pub fn current(&self) -> i64 {
        self.current.load(Ordering::SeqCst)
    }

    /// The highest value the counter has reached in its lifetime.
    pub fn max(&self) -> i64 {
        self.max.load(Ordering::SeqCst)
    }
}
