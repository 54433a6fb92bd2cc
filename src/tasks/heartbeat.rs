//! Heartbeat Task
//!
//! Background task that periodically reports cache statistics as `ops` events.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, trace};

use crate::events::{EventDetails, EventKind};
use crate::registry::Registry;

/// Spawns a background task that emits an `ops` event every `interval_secs`.
///
/// The task only reads counters and store sizes; it never waits on an
/// in-flight call-through. Abort the returned handle to stop it.
pub(crate) fn spawn_heartbeat_task(registry: Arc<Registry>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting cache heartbeat with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            registry.record(EventKind::Ops, EventDetails::default);
            trace!("Cache heartbeat emitted");
        }
    })
}
