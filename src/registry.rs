//! Shared cache state
//!
//! Namespace configs, lazily created stores, the disabled set, counters and
//! event emission. Owned by the facade and shared with every wrapped model.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheStats, Clock, NamespaceStore, PutOutcome, StatsSnapshot};
use crate::config::{CacheOptions, NamespaceConfig};
use crate::error::{CacheError, Result};
use crate::events::{log_delegate, Delegate, Event, EventDetails, EventKind};

pub(crate) struct Registry {
    configs: RwLock<HashMap<String, Arc<NamespaceConfig>>>,
    stores: RwLock<HashMap<String, Arc<NamespaceStore>>>,
    disabled: RwLock<HashSet<String>>,
    stats: CacheStats,
    debug: bool,
    delegate: Delegate,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub(crate) fn new(
        configs: BTreeMap<String, NamespaceConfig>,
        options: &CacheOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            configs: RwLock::new(
                configs
                    .into_iter()
                    .map(|(name, config)| (name, Arc::new(config)))
                    .collect(),
            ),
            stores: RwLock::new(HashMap::new()),
            disabled: RwLock::new(HashSet::new()),
            stats: CacheStats::new(),
            debug: options.debug,
            delegate: options.delegate.clone().unwrap_or_else(log_delegate),
            clock,
        }
    }

    pub(crate) fn config(&self, namespace: &str) -> Option<Arc<NamespaceConfig>> {
        self.configs.read().get(namespace).cloned()
    }

    /// Registers or replaces a namespace's config. Once a namespace has a
    /// store its config is fixed.
    pub(crate) fn register(&self, config: NamespaceConfig) -> Result<()> {
        if self.stores.read().contains_key(&config.namespace) {
            return Err(CacheError::InvalidConfig {
                namespace: config.namespace,
                reason: "namespace is already wrapped, its configuration is fixed".to_string(),
            });
        }
        info!(namespace = %config.namespace, "Registered cache namespace");
        self.configs
            .write()
            .insert(config.namespace.clone(), Arc::new(config));
        Ok(())
    }

    /// Returns the namespace's store, creating it on first use.
    pub(crate) fn store_for(&self, config: &NamespaceConfig) -> Arc<NamespaceStore> {
        if let Some(store) = self.stores.read().get(&config.namespace) {
            return Arc::clone(store);
        }
        let mut stores = self.stores.write();
        Arc::clone(stores.entry(config.namespace.clone()).or_insert_with(|| {
            Arc::new(NamespaceStore::new(
                config.namespace.clone(),
                config.capacity,
                Arc::clone(&self.clock),
            ))
        }))
    }

    pub(crate) fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.read().keys().cloned().collect();
        names.sort();
        names
    }

    // == Enable / Disable ==
    pub(crate) fn is_enabled(&self, namespace: &str) -> bool {
        !self.disabled.read().contains(namespace)
    }

    /// Toggles caching. Disabling drops the namespace's entries.
    pub(crate) fn set_enabled(&self, namespaces: &[&str], enabled: bool) {
        let targets = self.targets(namespaces);
        {
            let mut disabled = self.disabled.write();
            for name in &targets {
                if enabled {
                    disabled.remove(name);
                } else {
                    disabled.insert(name.clone());
                }
            }
        }
        if !enabled {
            let names: Vec<&str> = targets.iter().map(String::as_str).collect();
            self.clear_stores(&names);
        }
        info!(namespaces = ?targets, enabled, "Cache namespaces toggled");
    }

    fn targets(&self, namespaces: &[&str]) -> Vec<String> {
        if namespaces.is_empty() {
            self.namespaces()
        } else {
            namespaces.iter().map(|n| n.to_string()).collect()
        }
    }

    // == Clear ==
    /// Clears the given namespaces, or every namespace when none are named.
    pub(crate) fn clear(&self, namespaces: &[&str]) -> usize {
        let removed = self.clear_stores(namespaces);
        debug!(namespaces = ?namespaces, removed, "Cache cleared");
        removed
    }

    fn clear_stores(&self, namespaces: &[&str]) -> usize {
        self.selected_stores(namespaces)
            .iter()
            .map(|store| store.clear())
            .sum()
    }

    fn selected_stores(&self, namespaces: &[&str]) -> Vec<Arc<NamespaceStore>> {
        let stores = self.stores.read();
        if namespaces.is_empty() {
            stores.values().cloned().collect()
        } else {
            namespaces
                .iter()
                .filter_map(|name| stores.get(*name).cloned())
                .collect()
        }
    }

    // == Size ==
    pub(crate) fn size(&self, namespaces: &[&str]) -> usize {
        self.selected_stores(namespaces)
            .iter()
            .map(|store| store.len())
            .sum()
    }

    pub(crate) fn sizes(&self) -> BTreeMap<String, usize> {
        self.selected_stores(&[])
            .iter()
            .map(|store| (store.namespace().to_string(), store.len()))
            .collect()
    }

    // == Purge ==
    /// Sweeps expired entries, emitting one purge event per removed entry.
    pub(crate) fn purge_expired(&self, namespaces: &[&str]) -> usize {
        let mut total = 0;
        for store in self.selected_stores(namespaces) {
            let purged = store.purge_expired();
            total += purged.len();
            for hash in purged {
                self.record_purge(store.namespace(), hash);
            }
        }
        total
    }

    /// Emits events and counters for the side effects of a put.
    pub(crate) fn report_put(&self, namespace: &str, outcome: PutOutcome) {
        for hash in outcome.purged {
            self.record_purge(namespace, hash);
        }
        for hash in outcome.evicted {
            self.stats.record_eviction();
            debug!(namespace, hash = %hash, "Evicted entry over capacity");
        }
    }

    pub(crate) fn record_purge(&self, namespace: &str, hash: String) {
        self.record(EventKind::Purge, || EventDetails {
            namespace: Some(namespace.to_string()),
            hash: Some(hash),
            ..Default::default()
        });
    }

    // == Record ==
    /// Counts an event and forwards it to the delegate if the policy allows.
    ///
    /// Must not be called while holding a store lock.
    pub(crate) fn record(&self, kind: EventKind, details: impl FnOnce() -> EventDetails) {
        self.stats.record(kind);
        if !kind.is_forwarded(self.debug) {
            return;
        }
        let event = Event {
            kind,
            details: details(),
            stats: self.stats.snapshot(),
            sizes: kind.includes_sizes(self.debug).then(|| self.sizes()),
        };
        (self.delegate)(&event);
    }

    pub(crate) fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::config::{NamespaceSettings, Ttl};
    use parking_lot::Mutex;

    fn registry(debug: bool) -> (Registry, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let options = CacheOptions::new()
            .debug(debug)
            .delegate(Arc::new(move |e: &Event| sink.lock().push(e.clone())));
        let configs = BTreeMap::from([
            ("User".to_string(), NamespaceSettings::new().resolve("User").unwrap()),
            ("Page".to_string(), NamespaceSettings::new().resolve("Page").unwrap()),
        ]);
        (
            Registry::new(configs, &options, Arc::new(ManualClock::new())),
            events,
        )
    }

    fn fill(registry: &Registry, namespace: &str, count: usize) {
        let config = registry.config(namespace).unwrap();
        let store = registry.store_for(&config);
        for i in 0..count {
            store.put(format!("{namespace}-{i}"), Arc::new(i), Ttl::Never);
        }
    }

    #[test]
    fn test_store_created_once() {
        let (registry, _) = registry(false);
        let config = registry.config("User").unwrap();
        let a = registry.store_for(&config);
        let b = registry.store_for(&config);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_clear_is_scoped() {
        let (registry, _) = registry(false);
        fill(&registry, "User", 2);
        fill(&registry, "Page", 3);
        assert_eq!(registry.size(&[]), 5);

        assert_eq!(registry.clear(&["User"]), 2);
        assert_eq!(registry.size(&["User"]), 0);
        assert_eq!(registry.size(&["Page"]), 3);

        registry.clear(&["Unknown"]);
        assert_eq!(registry.size(&[]), 3);

        registry.clear(&[]);
        assert_eq!(registry.size(&[]), 0);
    }

    #[test]
    fn test_disable_keeps_config_and_clears_entries() {
        let (registry, _) = registry(false);
        fill(&registry, "User", 2);

        registry.set_enabled(&["User"], false);
        assert!(!registry.is_enabled("User"));
        assert!(registry.is_enabled("Page"));
        assert_eq!(registry.size(&["User"]), 0);
        assert!(registry.config("User").is_some());

        registry.set_enabled(&[], true);
        assert!(registry.is_enabled("User"));
    }

    #[test]
    fn test_register_after_wrap_is_rejected() {
        let (registry, _) = registry(false);
        fill(&registry, "User", 1);
        let config = NamespaceSettings::new().with_limit(5).resolve("User").unwrap();
        assert!(matches!(
            registry.register(config),
            Err(CacheError::InvalidConfig { .. })
        ));

        let config = NamespaceSettings::new().with_limit(5).resolve("Audit").unwrap();
        registry.register(config).unwrap();
        assert_eq!(registry.config("Audit").unwrap().capacity, 5);
        assert_eq!(registry.namespaces(), vec!["Audit", "Page", "User"]);
    }

    #[test]
    fn test_record_counts_but_suppresses_outside_debug() {
        let (registry, events) = registry(false);
        registry.record(EventKind::Hit, EventDetails::default);
        registry.record(EventKind::Ops, EventDetails::default);

        assert_eq!(registry.stats().hit, 1);
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Ops);
        assert!(events[0].sizes.is_some());
    }

    #[test]
    fn test_record_in_debug_carries_stats_and_sizes() {
        let (registry, events) = registry(true);
        fill(&registry, "User", 2);
        registry.record(EventKind::Miss, || EventDetails::for_namespace("User"));

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stats.miss, 1);
        assert_eq!(events[0].sizes.as_ref().unwrap()["User"], 2);
    }

    #[test]
    fn test_report_put_counts_purges_and_evictions() {
        let (registry, events) = registry(true);
        registry.report_put(
            "User",
            PutOutcome {
                stored: true,
                purged: vec!["a".to_string(), "b".to_string()],
                evicted: vec!["c".to_string()],
            },
        );

        let stats = registry.stats();
        assert_eq!(stats.purge, 2);
        assert_eq!(stats.evict, 1);
        assert_eq!(events.lock().len(), 2);
    }
}
