use meetgate_core::{Component, GatewayEvent};
use std::time::Instant;

/// Events emitted by the response cache.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A live entry was returned.
    Hit {
        namespace: String,
        key: String,
        timestamp: Instant,
    },
    /// No entry existed for the key.
    Miss {
        namespace: String,
        key: String,
        timestamp: Instant,
    },
    /// An entry existed but had expired; it was purged.
    Expired {
        namespace: String,
        key: String,
        timestamp: Instant,
    },
    /// An entry was evicted to make room for a new one.
    Eviction {
        namespace: String,
        key: String,
        timestamp: Instant,
    },
    /// Entries were removed by explicit invalidation.
    Invalidated {
        namespace: String,
        /// `None` when the whole namespace was invalidated.
        key: Option<String>,
        removed: usize,
        timestamp: Instant,
    },
}

impl GatewayEvent for CacheEvent {
    fn component(&self) -> Component {
        Component::Cache
    }

    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Expired { .. } => "expired",
            CacheEvent::Eviction { .. } => "eviction",
            CacheEvent::Invalidated { .. } => "invalidated",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Expired { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. }
            | CacheEvent::Invalidated { timestamp, .. } => *timestamp,
        }
    }

    fn operation(&self) -> &str {
        match self {
            CacheEvent::Hit { namespace, .. }
            | CacheEvent::Miss { namespace, .. }
            | CacheEvent::Expired { namespace, .. }
            | CacheEvent::Eviction { namespace, .. }
            | CacheEvent::Invalidated { namespace, .. } => namespace,
        }
    }
}
