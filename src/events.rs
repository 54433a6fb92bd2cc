//! Cache Events
//!
//! Structured events handed to the delegate, and the policy deciding which
//! of them are forwarded.
//!
//! | kind  | counted | debug | not debug |
//! |-------|---------|-------|-----------|
//! | init  | no      | yes   | no        |
//! | hit   | yes     | yes   | no        |
//! | miss  | yes     | yes   | no        |
//! | load  | yes     | yes   | no        |
//! | purge | yes     | yes   | no        |
//! | ops   | no      | yes   | yes       |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cache::StatsSnapshot;

// == Event Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A configured namespace was wrapped
    Init,
    /// Read served from the cache
    Hit,
    /// Read not in the cache, calling through
    Miss,
    /// Call-through result stored
    Load,
    /// Expired entry removed
    Purge,
    /// Periodic heartbeat
    Ops,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Init => "init",
            EventKind::Hit => "hit",
            EventKind::Miss => "miss",
            EventKind::Load => "load",
            EventKind::Purge => "purge",
            EventKind::Ops => "ops",
        }
    }

    /// Whether an event of this kind reaches the delegate.
    pub fn is_forwarded(&self, debug: bool) -> bool {
        debug || *self == EventKind::Ops
    }

    /// Whether the event carries per-namespace sizes.
    pub fn includes_sizes(&self, debug: bool) -> bool {
        debug || *self == EventKind::Ops
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Event Details ==
/// Kind-specific fields of an event. Unset fields are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Canonical form of the call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods_update: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl EventDetails {
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }
    }

    pub fn for_call(namespace: &str, operation: &str, key: &str, hash: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            operation: Some(operation.to_string()),
            key: Some(key.to_string()),
            hash: Some(hash.to_string()),
            ..Default::default()
        }
    }
}

// == Event ==
/// What the delegate receives.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub kind: EventKind,
    #[serde(flatten)]
    pub details: EventDetails,
    pub stats: StatsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<BTreeMap<String, usize>>,
}

// == Delegate ==
/// Event sink.
pub type Delegate = Arc<dyn Fn(&Event) + Send + Sync>;

/// Default sink: one debug line per event.
pub fn log_delegate() -> Delegate {
    Arc::new(|event: &Event| {
        let body = serde_json::to_string(event).unwrap_or_else(|e| format!("<{e}>"));
        debug!(
            ">>> CACHE {} >>> {}",
            event.kind.as_str().to_ascii_uppercase(),
            body
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarding_policy() {
        for kind in [
            EventKind::Init,
            EventKind::Hit,
            EventKind::Miss,
            EventKind::Load,
            EventKind::Purge,
        ] {
            assert!(kind.is_forwarded(true), "{kind} forwarded in debug");
            assert!(!kind.is_forwarded(false), "{kind} suppressed outside debug");
        }
        assert!(EventKind::Ops.is_forwarded(true));
        assert!(EventKind::Ops.is_forwarded(false));
        assert!(EventKind::Ops.includes_sizes(false));
        assert!(!EventKind::Hit.includes_sizes(false));
    }

    #[test]
    fn test_event_serialization() {
        let event = Event {
            kind: EventKind::Hit,
            details: EventDetails::for_call("User", "findOne", "{...}", "abc"),
            stats: StatsSnapshot::default(),
            sizes: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "hit");
        assert_eq!(json["namespace"], "User");
        assert_eq!(json["operation"], "findOne");
        assert_eq!(json["hash"], "abc");
        assert_eq!(json["stats"]["hit"], 0);
        assert!(json.get("sizes").is_none());
        assert!(json.get("limit").is_none());
    }

    #[test]
    fn test_log_delegate_does_not_panic() {
        let delegate = log_delegate();
        delegate(&Event {
            kind: EventKind::Ops,
            details: EventDetails::default(),
            stats: StatsSnapshot::default(),
            sizes: Some(BTreeMap::from([("User".to_string(), 3)])),
        });
    }
}
