//! Namespace Store Module
//!
//! Per-namespace entry storage with lazy expiry purge and capacity eviction.
//!
//! Eviction removes the surviving entry with the earliest expiry, ties going to
//! the oldest insert. This approximates LRU without recency tracking: entries
//! written first under a shared TTL expire first. Never-expiring entries are
//! only evicted once no finite-expiry entry is left.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheEntry, CachedValue, Clock};
use crate::config::Ttl;

// == Lookup ==
/// Result of reading a key.
#[derive(Debug)]
pub enum Lookup {
    /// Present and not expired
    Fresh(CachedValue),
    /// Present but expired, treated as absent
    Expired,
    Absent,
}

// == Put Outcome ==
/// Side effects of an insert.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    /// Whether the value was written
    pub stored: bool,
    /// Keys removed because they had expired
    pub purged: Vec<String>,
    /// Keys removed to get back under capacity
    pub evicted: Vec<String>,
}

#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
    generation: u64,
}

// == Namespace Store ==
/// Thread-safe mapping from key hash to cache entry for one namespace.
///
/// The lock is only held for a single operation, never across a call-through.
#[derive(Debug)]
pub struct NamespaceStore {
    namespace: String,
    capacity: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<StoreInner>,
}

impl NamespaceStore {
    // == Constructor ==
    /// Creates an empty store holding at most `capacity` entries.
    pub fn new(namespace: impl Into<String>, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            namespace: namespace.into(),
            capacity: capacity.max(1),
            clock,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Get ==
    /// Looks up a key. Expired entries are never returned; they stay until the
    /// next put or purge removes or replaces them.
    pub fn get(&self, key: &str) -> Lookup {
        let now = self.clock.now_ms();
        let inner = self.inner.lock();

        match inner.entries.get(key) {
            Some(entry) if entry.is_expired(now) => Lookup::Expired,
            Some(entry) => Lookup::Fresh(Arc::clone(&entry.value)),
            None => Lookup::Absent,
        }
    }

    // == Put ==
    /// Inserts or overwrites a value, then purges expired entries and evicts
    /// until the store is back within capacity.
    pub fn put(&self, key: String, value: CachedValue, ttl: Ttl) -> PutOutcome {
        let mut inner = self.inner.lock();
        self.insert_locked(&mut inner, key, value, ttl)
    }

    /// Like [`put`](Self::put), but only if the store has not been cleared
    /// since `generation` was observed.
    pub fn put_if_current(
        &self,
        generation: u64,
        key: String,
        value: CachedValue,
        ttl: Ttl,
    ) -> PutOutcome {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(
                namespace = %self.namespace,
                "Store cleared while loading, result not cached"
            );
            return PutOutcome::default();
        }
        self.insert_locked(&mut inner, key, value, ttl)
    }

    fn insert_locked(
        &self,
        inner: &mut StoreInner,
        key: String,
        value: CachedValue,
        ttl: Ttl,
    ) -> PutOutcome {
        let now = self.clock.now_ms();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(key, CacheEntry::new(value, now, ttl, seq));

        let purged = purge_locked(inner, now);
        let mut evicted = Vec::new();
        while inner.entries.len() > self.capacity {
            match evict_earliest_locked(inner) {
                Some(key) => evicted.push(key),
                None => break,
            }
        }

        PutOutcome {
            stored: true,
            purged,
            evicted,
        }
    }

    // == Purge Expired ==
    /// Removes every expired entry and returns their keys.
    pub fn purge_expired(&self) -> Vec<String> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        purge_locked(&mut inner, now)
    }

    // == Evict ==
    /// Removes the entry with the earliest expiry if the store is over capacity.
    pub fn evict_one_if_over_capacity(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        if inner.entries.len() > self.capacity {
            evict_earliest_locked(&mut inner)
        } else {
            None
        }
    }

    // == Clear ==
    /// Removes all entries and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let count = inner.entries.len();
        inner.entries.clear();
        count
    }

    /// Number of clears so far, used to detect a clear racing a load.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }
}

fn purge_locked(inner: &mut StoreInner, now: i64) -> Vec<String> {
    let expired: Vec<String> = inner
        .entries
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(key, _)| key.clone())
        .collect();

    for key in &expired {
        inner.entries.remove(key);
    }
    expired
}

fn evict_earliest_locked(inner: &mut StoreInner) -> Option<String> {
    let victim = inner
        .entries
        .iter()
        .min_by_key(|(_, entry)| (entry.expires_at, entry.seq))
        .map(|(key, _)| key.clone())?;
    inner.entries.remove(&victim);
    Some(victim)
}
