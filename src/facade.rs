//! Cache Facade
//!
//! Process-wide entry point: owns the namespace configs and stores, wraps
//! models, and exposes the administrative operations.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{Clock, StatsSnapshot, SystemClock};
use crate::config::{CacheOptions, CacheSettings, NamespaceSettings};
use crate::error::Result;
use crate::model::Model;
use crate::proxy::Cached;
use crate::registry::Registry;
use crate::tasks::spawn_heartbeat_task;

// == Cache ==
/// A read-through cache for any number of model namespaces.
///
/// Dropping the cache stops its heartbeat. Wrapped models keep working and
/// keep their entries.
pub struct Cache {
    registry: Arc<Registry>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl Cache {
    /// Creates a cache using the wall clock.
    ///
    /// A non-zero `ops` interval starts the heartbeat, which requires a tokio
    /// runtime; without one the heartbeat is skipped with a warning.
    pub fn new(settings: CacheSettings, options: CacheOptions) -> Result<Self> {
        Self::with_clock(settings, options, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(
        settings: CacheSettings,
        options: CacheOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let configs = settings.resolve()?;
        let namespaces = configs.len();
        let registry = Arc::new(Registry::new(configs, &options, clock));

        let heartbeat = if options.ops == 0 {
            None
        } else if Handle::try_current().is_ok() {
            Some(spawn_heartbeat_task(Arc::clone(&registry), options.ops))
        } else {
            warn!(
                ops = options.ops,
                "No tokio runtime available, cache heartbeat disabled"
            );
            None
        };

        info!(
            namespaces,
            debug = options.debug,
            ops = options.ops,
            "Model cache initialized"
        );

        Ok(Self {
            registry,
            heartbeat: Mutex::new(heartbeat),
        })
    }

    // == Wrap ==
    /// Wraps a model. Namespaces without configuration pass every call through.
    pub fn wrap<M: Model>(&self, target: M) -> Cached<M> {
        Cached::new(target, Arc::clone(&self.registry))
    }

    /// Registers settings for the model's namespace, then wraps it.
    ///
    /// Fails if the namespace has already been wrapped.
    pub fn wrap_with<M: Model>(&self, target: M, settings: NamespaceSettings) -> Result<Cached<M>> {
        let config = settings.resolve(target.name())?;
        self.registry.register(config)?;
        Ok(self.wrap(target))
    }

    // == Administration ==
    /// Clears the named namespaces, or all of them when none are named.
    /// Returns the number of entries removed.
    pub fn clear(&self, namespaces: &[&str]) -> usize {
        self.registry.clear(namespaces)
    }

    /// Turns caching off for the named namespaces (all when none are named)
    /// and drops their entries. Their configuration is kept.
    pub fn disable(&self, namespaces: &[&str]) {
        self.registry.set_enabled(namespaces, false);
    }

    /// Turns caching back on for the named namespaces (all when none are named).
    pub fn enable(&self, namespaces: &[&str]) {
        self.registry.set_enabled(namespaces, true);
    }

    pub fn is_enabled(&self, namespace: &str) -> bool {
        self.registry.is_enabled(namespace)
    }

    /// Total entry count of the named namespaces, or of all of them.
    pub fn size(&self, namespaces: &[&str]) -> usize {
        self.registry.size(namespaces)
    }

    /// Removes expired entries now instead of waiting for the next insert.
    pub fn purge_expired(&self, namespaces: &[&str]) -> usize {
        self.registry.purge_expired(namespaces)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.registry.stats()
    }

    /// Configured namespace names, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        self.registry.namespaces()
    }

    // == Heartbeat ==
    /// Stops the heartbeat. Returns false if it was not running.
    pub fn stop_heartbeat(&self) -> bool {
        match self.heartbeat.lock().take() {
            Some(handle) => {
                handle.abort();
                info!("Cache heartbeat stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Releases background resources.
    pub fn shutdown(&self) {
        self.stop_heartbeat();
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
