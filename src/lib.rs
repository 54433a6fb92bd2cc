//! Model Cache - A transparent read-through cache for asynchronous models
//!
//! Wraps data-access objects so repeated identical reads are served from
//! memory, with TTL expiration, per-namespace capacity eviction and
//! invalidation on writes.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod facade;
pub mod model;
pub mod proxy;
mod registry;
mod tasks;

pub use cache::{ManualClock, StatsSnapshot};
pub use config::{CacheOptions, CacheSettings, NamespaceSettings, Ttl};
pub use error::{CacheError, Result};
pub use events::{Delegate, Event, EventKind};
pub use facade::Cache;
pub use model::{Arg, Model, Reply};
pub use proxy::Cached;
