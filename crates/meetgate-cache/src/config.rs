//! Configuration for the response cache.

use crate::events::CacheEvent;
use crate::eviction::EvictionPolicy;
use crate::ResponseCache;
use meetgate_core::EventListeners;
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the response cache.
pub struct CacheConfig {
    pub(crate) default_ttl: Duration,
    pub(crate) namespace_ttls: HashMap<String, Duration>,
    pub(crate) max_items: usize,
    pub(crate) eviction_policy: EvictionPolicy,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
    pub(crate) name: String,
}

impl CacheConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// TTL applied to entries in `namespace` when no override is given.
    pub fn ttl_for(&self, namespace: &str) -> Duration {
        self.namespace_ttls
            .get(namespace)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Maximum number of entries across all namespaces.
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// The configured eviction policy.
    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction_policy
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfigBuilder::new().into_config()
    }
}

/// Builder for configuring and constructing a [`ResponseCache`].
pub struct CacheConfigBuilder {
    default_ttl: Duration,
    namespace_ttls: HashMap<String, Duration>,
    max_items: usize,
    eviction_policy: EvictionPolicy,
    event_listeners: EventListeners<CacheEvent>,
    name: String,
}

impl CacheConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            namespace_ttls: HashMap::new(),
            max_items: 1000,
            eviction_policy: EvictionPolicy::default(),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the TTL used when neither a namespace TTL nor an override applies.
    ///
    /// Default: 5 minutes
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the default TTL for one namespace.
    pub fn namespace_ttl(mut self, namespace: impl Into<String>, ttl: Duration) -> Self {
        self.namespace_ttls.insert(namespace.into(), ttl);
        self
    }

    /// Sets the maximum number of entries in the cache.
    ///
    /// Default: 1000
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Sets the eviction policy.
    ///
    /// Default: [`EvictionPolicy::Fifo`]
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    /// Sets the name of this cache instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked with `(namespace, key)` on every cache hit.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CacheEvent| {
            if let CacheEvent::Hit { namespace, key, .. } = event {
                f(namespace, key);
            }
        });
        self
    }

    /// Registers a callback invoked with `(namespace, key)` on every miss,
    /// including reads that found an expired entry.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CacheEvent| match event {
            CacheEvent::Miss { namespace, key, .. } | CacheEvent::Expired { namespace, key, .. } => {
                f(namespace, key)
            }
            _ => {}
        });
        self
    }

    /// Registers a callback invoked with `(namespace, key)` when an entry is evicted.
    pub fn on_eviction<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CacheEvent| {
            if let CacheEvent::Eviction { namespace, key, .. } = event {
                f(namespace, key);
            }
        });
        self
    }

    /// Registers a callback invoked with `(namespace, removed)` after an invalidation.
    pub fn on_invalidation<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CacheEvent| {
            if let CacheEvent::Invalidated {
                namespace, removed, ..
            } = event
            {
                f(namespace, *removed);
            }
        });
        self
    }

    fn into_config(self) -> CacheConfig {
        CacheConfig {
            default_ttl: self.default_ttl,
            namespace_ttls: self.namespace_ttls,
            max_items: self.max_items,
            eviction_policy: self.eviction_policy,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the cache.
    pub fn build(self) -> ResponseCache {
        ResponseCache::new(self.into_config())
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
