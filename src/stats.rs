//! Cache Statistics
//!
//! Relaxed atomic counters updated on the hot path and copied out into plain
//! snapshot structs on demand.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic event counter
#[derive(Debug, Default)]
pub(crate) struct Counter(AtomicU64);

impl Counter {
    pub(crate) fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Local tier statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    /// Resident entries at snapshot time
    pub size: usize,
    pub capacity: usize,
}

impl LocalStats {
    /// Hits as a percentage of lookups
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            (self.hits as f64 / lookups as f64) * 100.0
        }
    }
}

/// Two-level composition statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TwoLevelStats {
    pub local_hits: u64,
    pub remote_hits: u64,
    pub misses: u64,
    /// Remote failures on the read path, timeouts included
    pub remote_errors: u64,
    /// Background writes/deletes that were dropped or failed
    pub background_failures: u64,
}

/// Multi-level composition statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiLevelStats {
    pub local_hits: u64,
    pub remote_hits: u64,
    /// Loader invocations
    pub loads: u64,
    /// Callers that joined an in-flight load instead of starting one
    pub coalesced: u64,
    pub load_errors: u64,
    pub remote_errors: u64,
    pub background_failures: u64,
    /// Loads in flight at snapshot time
    pub in_flight: usize,
    pub remote_healthy: bool,
}
