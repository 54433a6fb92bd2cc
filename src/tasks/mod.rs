//! Background Tasks Module
//!
//! Contains background tasks that run alongside the cache.
//!
//! # Tasks
//! - Heartbeat: Emits an `ops` event with the stats snapshot at a configured interval

mod heartbeat;

pub(crate) use heartbeat::spawn_heartbeat_task;
