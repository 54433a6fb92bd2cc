//! Cache Module
//!
//! Key construction, per-namespace entry storage with TTL expiry and capacity
//! eviction, and cache statistics.

mod clock;
mod entry;
mod key;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CachedValue, Expiry};
pub use key::{canonicalize, digest, CacheKey};
pub use stats::{hit_ratio, CacheStats, StatsSnapshot};
pub use store::{Lookup, NamespaceStore, PutOutcome};
