//! Configuration Module
//!
//! Per-namespace cache settings, global cache options, and their resolution
//! into the immutable configuration the interceptor works from.

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};
use crate::events::Delegate;

// == Defaults ==
/// Default time-to-live for cached results (one hour)
pub const DEFAULT_TTL_SECS: u64 = 60 * 60;

/// Default maximum number of entries per namespace
pub const DEFAULT_LIMIT: usize = 50;

/// Operations cached when a namespace does not list its own
pub const DEFAULT_READ_METHODS: &[&str] = &[
    "findById",
    "findByPk",
    "findOne",
    "findAll",
    "findAndCountAll",
    "count",
    "min",
    "max",
    "sum",
    "aggregate",
];

/// Operations that invalidate a namespace when it does not list its own
pub const DEFAULT_WRITE_METHODS: &[&str] = &[
    "create",
    "bulkCreate",
    "update",
    "destroy",
    "upsert",
    "insertOrUpdate",
    "findOrBuild",
    "findOrCreate",
    "findCreateFind",
    "increment",
    "decrement",
    "restore",
    "truncate",
];

const CONFIG_ENV: &str = "MODEL_CACHE_CONFIG";
const DEBUG_ENV: &str = "MODEL_CACHE_DEBUG";
const OPS_ENV: &str = "MODEL_CACHE_OPS";

// == TTL ==
/// How long a cached result stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    After(Duration),
    Never,
}

impl Default for Ttl {
    fn default() -> Self {
        Ttl::After(Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

/// Raw `ttl` setting: a number of seconds, or `false` for no expiry.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TtlSetting {
    Seconds(f64),
    Flag(bool),
}

impl TtlSetting {
    fn resolve(self, namespace: &str) -> Result<Ttl> {
        match self {
            TtlSetting::Flag(false) => Ok(Ttl::Never),
            TtlSetting::Flag(true) => Ok(Ttl::default()),
            // Beyond the range of Duration, clamp rather than panic
            TtlSetting::Seconds(secs) if secs.is_finite() && secs > 0.0 => Ok(Ttl::After(
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX),
            )),
            TtlSetting::Seconds(secs) => Err(CacheError::InvalidConfig {
                namespace: namespace.to_string(),
                reason: format!("ttl must be a positive number of seconds or false, got {secs}"),
            }),
        }
    }
}

// == Namespace Settings ==
/// User-facing settings for one namespace. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamespaceSettings {
    pub ttl: Option<TtlSetting>,
    pub methods: Option<Vec<String>>,
    pub methods_update: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub clear_on_update: Option<bool>,
}

impl NamespaceSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL in seconds.
    pub fn with_ttl(mut self, secs: u64) -> Self {
        self.ttl = Some(TtlSetting::Seconds(secs as f64));
        self
    }

    /// Disables time-based expiry.
    pub fn never_expire(mut self) -> Self {
        self.ttl = Some(TtlSetting::Flag(false));
        self
    }

    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_update_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods_update = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn clear_on_update(mut self, enabled: bool) -> Self {
        self.clear_on_update = Some(enabled);
        self
    }

    /// Applies defaults and validates the settings.
    pub fn resolve(&self, namespace: &str) -> Result<NamespaceConfig> {
        let ttl = match self.ttl {
            Some(setting) => setting.resolve(namespace)?,
            None => Ttl::default(),
        };

        let capacity = self.limit.unwrap_or(DEFAULT_LIMIT);
        if capacity == 0 {
            return Err(CacheError::InvalidConfig {
                namespace: namespace.to_string(),
                reason: "limit must be at least 1".to_string(),
            });
        }

        Ok(NamespaceConfig {
            namespace: namespace.to_string(),
            ttl,
            watched_reads: method_set(self.methods.as_deref(), DEFAULT_READ_METHODS),
            watched_writes: method_set(self.methods_update.as_deref(), DEFAULT_WRITE_METHODS),
            capacity,
            invalidate_on_write: self.clear_on_update.unwrap_or(true),
        })
    }
}

fn method_set(configured: Option<&[String]>, defaults: &[&str]) -> HashSet<String> {
    match configured {
        Some(methods) => methods.iter().cloned().collect(),
        None => defaults.iter().map(|m| m.to_string()).collect(),
    }
}

// == Cache Settings ==
/// Mapping from namespace name to its settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CacheSettings {
    pub namespaces: BTreeMap<String, NamespaceSettings>,
}

impl CacheSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the settings of one namespace.
    pub fn namespace(mut self, name: impl Into<String>, settings: NamespaceSettings) -> Self {
        self.namespaces.insert(name.into(), settings);
        self
    }

    /// Parses a JSON mapping such as `{"User": {"ttl": 300, "limit": 10}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads settings from the `MODEL_CACHE_CONFIG` environment variable.
    ///
    /// An unset variable yields an empty mapping; a malformed one is an error.
    pub fn from_env() -> Result<Self> {
        match env::var(CONFIG_ENV) {
            Ok(json) => Self::from_json(&json),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Resolves every namespace, failing on the first invalid one.
    pub fn resolve(&self) -> Result<BTreeMap<String, NamespaceConfig>> {
        self.namespaces
            .iter()
            .map(|(name, settings)| Ok((name.clone(), settings.resolve(name)?)))
            .collect()
    }
}

// == Namespace Config ==
/// Resolved, immutable configuration of one cached namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceConfig {
    pub namespace: String,
    pub ttl: Ttl,
    pub watched_reads: HashSet<String>,
    pub watched_writes: HashSet<String>,
    pub capacity: usize,
    pub invalidate_on_write: bool,
}

impl NamespaceConfig {
    pub fn is_read(&self, operation: &str) -> bool {
        self.watched_reads.contains(operation)
    }

    pub fn is_write(&self, operation: &str) -> bool {
        self.watched_writes.contains(operation)
    }
}

// == Cache Options ==
/// Process-wide options of a cache instance.
#[derive(Clone, Default)]
pub struct CacheOptions {
    /// Forward per-call events (init/hit/miss/load/purge) to the delegate
    pub debug: bool,
    /// Heartbeat interval in seconds, 0 disables it
    pub ops: u64,
    /// Event sink, defaults to a tracing-based logger
    pub delegate: Option<Delegate>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn ops(mut self, interval_secs: u64) -> Self {
        self.ops = interval_secs;
        self
    }

    pub fn delegate(mut self, delegate: Delegate) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Creates options from environment variables.
    ///
    /// # Environment Variables
    /// - `MODEL_CACHE_DEBUG` - Forward per-call events (default: false)
    /// - `MODEL_CACHE_OPS` - Heartbeat interval in seconds (default: 0, disabled)
    pub fn from_env() -> Self {
        Self {
            debug: env::var(DEBUG_ENV)
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(false),
            ops: env::var(OPS_ENV)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            delegate: None,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("debug", &self.debug)
            .field("ops", &self.ops)
            .field("delegate", &self.delegate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
