//! Caching proxy
//!
//! [`Cached`] wraps a [`Model`] and is itself a `Model` with the same record
//! type. Watched reads go through the namespace store, watched writes
//! invalidate it, everything else is forwarded untouched.

use std::sync::Arc;

use tracing::{debug, error};

use crate::cache::{CacheKey, CachedValue, Lookup, NamespaceStore};
use crate::config::{NamespaceConfig, Ttl};
use crate::error::CacheError;
use crate::events::{EventDetails, EventKind};
use crate::model::{has_transaction, Arg, Model, Reply};
use crate::registry::Registry;

struct Slot {
    config: Arc<NamespaceConfig>,
    store: Arc<NamespaceStore>,
}

// == Cached ==
/// A model whose watched operations are served through the cache.
pub struct Cached<M: Model> {
    target: M,
    namespace: String,
    slot: Option<Slot>,
    registry: Arc<Registry>,
}

impl<M: Model> Cached<M> {
    pub(crate) fn new(target: M, registry: Arc<Registry>) -> Self {
        let namespace = target.name().to_string();
        let slot = match registry.config(&namespace) {
            Some(config) => {
                let store = registry.store_for(&config);
                registry.record(EventKind::Init, || init_details(&config));
                Some(Slot { config, store })
            }
            None => {
                debug!(namespace = %namespace, "No cache configured, operations pass through");
                None
            }
        };

        Self {
            target,
            namespace,
            slot,
            registry,
        }
    }

    /// The wrapped model, reached without any caching.
    pub fn bypass_cache(&self) -> &M {
        &self.target
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether the namespace has a cache configuration.
    pub fn is_cached(&self) -> bool {
        self.slot.is_some()
    }

    /// Drops this namespace's entries.
    pub fn clear_cache(&self) -> usize {
        self.registry.clear(&[self.namespace.as_str()])
    }

    /// Drops the entries of every namespace of the owning cache.
    pub fn clear_cache_all(&self) -> usize {
        self.registry.clear(&[])
    }

    fn read<'a>(&'a self, slot: &'a Slot, operation: &'a str, args: &'a [Arg]) -> Reply<'a, M::Record> {
        if has_transaction(args) {
            debug!(namespace = %self.namespace, operation, "Transactional read bypasses cache");
            return self.target.call(operation, args);
        }

        let key = CacheKey::new(&self.namespace, operation, args);
        match slot.store.get(&key.hash) {
            Lookup::Fresh(value) => {
                if let Some(record) = value.downcast_ref::<M::Record>() {
                    let record = record.clone();
                    self.registry.record(EventKind::Hit, || self.call_details(operation, &key));
                    return Reply::resolved(Ok(Some(record)));
                }
                debug!(namespace = %self.namespace, hash = %key.hash, "Cached value has a foreign type, reloading");
            }
            Lookup::Expired | Lookup::Absent => {}
        }

        let generation = slot.store.generation();
        self.registry.record(EventKind::Miss, || self.call_details(operation, &key));

        let pending = match self.target.call(operation, args) {
            Reply::Pending(fut) => fut,
            Reply::Ready(_) => {
                error!(namespace = %self.namespace, operation, "Watched read answered synchronously");
                return Reply::resolved(Err(CacheError::NotAsync {
                    namespace: self.namespace.clone(),
                    operation: operation.to_string(),
                }));
            }
        };

        Reply::pending(async move {
            let result = pending.await;
            if let Ok(Some(record)) = &result {
                self.store_result(slot, operation, key, record.clone(), generation);
            }
            result
        })
    }

    fn store_result(
        &self,
        slot: &Slot,
        operation: &str,
        key: CacheKey,
        record: M::Record,
        generation: u64,
    ) {
        if !self.registry.is_enabled(&self.namespace) {
            return;
        }
        let value: CachedValue = Arc::new(record);
        let outcome = slot
            .store
            .put_if_current(generation, key.hash.clone(), value, slot.config.ttl);
        if outcome.stored {
            self.registry
                .record(EventKind::Load, || self.call_details(operation, &key));
        }
        self.registry.report_put(&self.namespace, outcome);
    }

    fn write<'a>(&'a self, slot: &'a Slot, operation: &'a str, args: &'a [Arg]) -> Reply<'a, M::Record> {
        if slot.config.invalidate_on_write {
            let removed = slot.store.clear();
            debug!(namespace = %self.namespace, operation, removed, "Write invalidated namespace");
        }
        self.target.call(operation, args)
    }

    fn call_details(&self, operation: &str, key: &CacheKey) -> EventDetails {
        EventDetails::for_call(&self.namespace, operation, &key.canonical, &key.hash)
    }
}

impl<M: Model> Model for Cached<M> {
    type Record = M::Record;

    fn name(&self) -> &str {
        self.target.name()
    }

    fn call<'a>(&'a self, operation: &'a str, args: &'a [Arg]) -> Reply<'a, Self::Record> {
        let Some(slot) = &self.slot else {
            return self.target.call(operation, args);
        };
        if !self.registry.is_enabled(&self.namespace) {
            return self.target.call(operation, args);
        }

        if slot.config.is_read(operation) {
            self.read(slot, operation, args)
        } else if slot.config.is_write(operation) {
            self.write(slot, operation, args)
        } else {
            self.target.call(operation, args)
        }
    }
}

fn init_details(config: &NamespaceConfig) -> EventDetails {
    let mut methods: Vec<String> = config.watched_reads.iter().cloned().collect();
    methods.sort();
    let mut methods_update: Vec<String> = config.watched_writes.iter().cloned().collect();
    methods_update.sort();

    EventDetails {
        namespace: Some(config.namespace.clone()),
        ttl: Some(match config.ttl {
            Ttl::After(d) => format!("{}s", d.as_secs_f64()),
            Ttl::Never => "never".to_string(),
        }),
        methods: Some(methods),
        methods_update: Some(methods_update),
        limit: Some(config.capacity),
        ..Default::default()
    }
}
