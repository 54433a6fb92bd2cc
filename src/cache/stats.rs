//! Cache Statistics Module
//!
//! Process-wide counters for cache events: hits, misses, loads, purges and evictions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::events::EventKind;

// == Cache Stats ==
/// Lock-free cache counters, monotonically increasing for the cache's lifetime.
#[derive(Debug, Default)]
pub struct CacheStats {
    hit: AtomicU64,
    miss: AtomicU64,
    load: AtomicU64,
    purge: AtomicU64,
    evict: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record ==
    /// Increments the counter matching an event kind. `init` and `ops` are not counted.
    pub fn record(&self, kind: EventKind) {
        let counter = match kind {
            EventKind::Hit => &self.hit,
            EventKind::Miss => &self.miss,
            EventKind::Load => &self.load,
            EventKind::Purge => &self.purge,
            EventKind::Init | EventKind::Ops => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&self) {
        self.evict.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let hit = self.hit.load(Ordering::Relaxed);
        let miss = self.miss.load(Ordering::Relaxed);
        StatsSnapshot {
            hit,
            miss,
            load: self.load.load(Ordering::Relaxed),
            purge: self.purge.load(Ordering::Relaxed),
            evict: self.evict.load(Ordering::Relaxed),
            ratio: hit_ratio(hit, miss),
        }
    }
}

// == Stats Snapshot ==
/// Copy of the counters plus the derived hit ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub hit: u64,
    pub miss: u64,
    pub load: u64,
    pub purge: u64,
    pub evict: u64,
    pub ratio: f64,
}

// == Hit Ratio ==
/// Returns hit / (hit + miss), or 0.0 if no reads have been served yet.
pub fn hit_ratio(hit: u64, miss: u64) -> f64 {
    let total = hit + miss;
    if total == 0 {
        0.0
    } else {
        hit as f64 / total as f64
    }
}
