//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Ttl;

/// Type-erased cached value. Each namespace stores its model's record type.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

// == Expiry ==
/// Instant after which an entry is stale.
///
/// `Never` orders after every concrete instant, so "earliest expiry" comparisons
/// treat never-expiring entries as infinitely far in the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Expiry {
    /// Unix milliseconds
    At(i64),
    Never,
}

impl Expiry {
    /// Computes the expiry of an entry written at `now_ms` with the given TTL.
    pub fn from_ttl(now_ms: i64, ttl: Ttl) -> Self {
        match ttl {
            Ttl::After(duration) => Expiry::At(now_ms.saturating_add(duration_ms(duration))),
            Ttl::Never => Expiry::Never,
        }
    }

    /// An entry is expired once the current time reaches its expiry instant.
    pub fn is_passed(&self, now_ms: i64) -> bool {
        match self {
            Expiry::At(at) => now_ms >= *at,
            Expiry::Never => false,
        }
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

// == Cache Entry ==
/// A stored call result. Never mutated after creation; overwrites replace it.
#[derive(Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: CachedValue,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// When the entry stops being served
    pub expires_at: Expiry,
    /// Insertion sequence number, breaks eviction ties
    pub seq: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry written at `now_ms`.
    pub fn new(value: CachedValue, now_ms: i64, ttl: Ttl, seq: u64) -> Self {
        Self {
            value,
            created_at: now_ms,
            expires_at: Expiry::from_ttl(now_ms, ttl),
            seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_passed(now_ms)
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}
