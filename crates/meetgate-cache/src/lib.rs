//! Namespaced TTL response cache.
//!
//! Cached upstream responses are grouped by namespace (one per resource
//! family such as `rooms` or `recordings`). Every entry expires after a TTL
//! chosen at insert time and is purged lazily the next time it is read.
//! Writes elsewhere in the system invalidate single entries or whole
//! namespaces.
//!
//! # Features
//!
//! - **Namespaces**: point invalidation and namespace-wide invalidation
//! - **TTL**: global default, per-namespace defaults and per-insert overrides
//! - **Bounded size**: oldest-inserted entries are evicted first; LRU is opt-in
//! - **Heterogeneous values**: any `Clone + Send + Sync + 'static` type can be stored
//! - **Event System**: hit, miss, eviction and invalidation callbacks
//!
//! # Examples
//!
//! ```
//! use meetgate_cache::ResponseCache;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = ResponseCache::builder()
//!     .default_ttl(Duration::from_secs(60))
//!     .namespace_ttl("recordings", Duration::from_secs(10))
//!     .max_items(500)
//!     .on_hit(|ns, key| println!("hit {ns}:{key}"))
//!     .build();
//!
//! cache.set("rooms", "standup", String::from("room payload"), None);
//! assert_eq!(cache.get::<String>("rooms", "standup").as_deref(), Some("room payload"));
//!
//! cache.invalidate_namespace("rooms");
//! assert!(cache.get::<String>("rooms", "standup").is_none());
//! # }
//! ```
//!
//! # Eviction
//!
//! With the default [`EvictionPolicy::Fifo`] a full cache drops the entry that
//! was inserted first, even if it is read constantly. Overwriting a key does
//! not move it to the back of the queue.

mod config;
mod events;
mod eviction;
mod store;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use events::CacheEvent;
pub use eviction::EvictionPolicy;

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use store::{CacheKey, CacheStore, Lookup};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A namespaced, size-bounded cache with per-entry expiry.
///
/// The cache is internally synchronized; share it with `Arc`. Critical
/// sections never await.
pub struct ResponseCache {
    config: CacheConfig,
    store: Mutex<CacheStore>,
}

impl ResponseCache {
    /// Creates a cache from a configuration.
    pub fn new(config: CacheConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "meetgate_cache_requests_total",
                    "Total number of cache lookups (hits and misses)"
                );
                describe_counter!(
                    "meetgate_cache_evictions_total",
                    "Total number of entries evicted to make room"
                );
                describe_counter!(
                    "meetgate_cache_invalidations_total",
                    "Total number of entries removed by invalidation"
                );
                describe_gauge!("meetgate_cache_size", "Current number of cache entries");
            });
        }

        let store = CacheStore::new(config.max_items, config.eviction_policy);
        Self {
            config,
            store: Mutex::new(store),
        }
    }

    /// Returns a builder for a new cache.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the live value stored under `namespace`/`key`.
    ///
    /// Returns `None` when the key is missing, expired, or holds a value of a
    /// different type. Expired entries are removed.
    pub fn get<V>(&self, namespace: &str, key: &str) -> Option<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        let cache_key = CacheKey::new(namespace, key);
        let lookup = self.lock().get(&cache_key);

        match lookup {
            Lookup::Hit(entry) => match entry.value.downcast_ref::<V>() {
                Some(value) => {
                    self.record_hit(&cache_key);
                    Some(value.clone())
                }
                None => {
                    #[cfg(feature = "tracing")]
                    debug!(cache = %self.config.name, key = %cache_key, "Cached value has unexpected type");
                    self.record_miss(&cache_key, false);
                    None
                }
            },
            Lookup::Miss => {
                self.record_miss(&cache_key, false);
                None
            }
            Lookup::Expired => {
                self.record_miss(&cache_key, true);
                None
            }
        }
    }

    /// Returns the ETag stored alongside a live entry.
    pub fn etag(&self, namespace: &str, key: &str) -> Option<String> {
        match self.lock().get(&CacheKey::new(namespace, key)) {
            Lookup::Hit(entry) => entry.etag,
            _ => None,
        }
    }

    /// Stores `value`, overwriting any previous entry.
    ///
    /// The entry expires after `ttl` when given, otherwise after the
    /// namespace default, otherwise after the global default.
    pub fn set<V>(&self, namespace: &str, key: &str, value: V, ttl: Option<Duration>)
    where
        V: Send + Sync + 'static,
    {
        self.insert(namespace, key, Arc::new(value), ttl, None);
    }

    /// Stores `value` together with the ETag the upstream returned for it.
    pub fn set_with_etag<V>(
        &self,
        namespace: &str,
        key: &str,
        value: V,
        etag: impl Into<String>,
        ttl: Option<Duration>,
    ) where
        V: Send + Sync + 'static,
    {
        self.insert(namespace, key, Arc::new(value), ttl, Some(etag.into()));
    }

    fn insert(
        &self,
        namespace: &str,
        key: &str,
        value: Arc<dyn Any + Send + Sync>,
        ttl: Option<Duration>,
        etag: Option<String>,
    ) {
        let ttl = ttl.unwrap_or_else(|| self.config.ttl_for(namespace));
        let (evicted, _size) = {
            let mut store = self.lock();
            let evicted = store.insert(CacheKey::new(namespace, key), value, ttl, etag);
            (evicted, store.len())
        };

        #[cfg(feature = "tracing")]
        trace!(cache = %self.config.name, namespace, key, ttl_ms = ttl.as_millis() as u64, "Cache set");

        #[cfg(feature = "metrics")]
        gauge!("meetgate_cache_size", "cache" => self.config.name.clone()).set(_size as f64);

        if let Some(evicted) = evicted {
            #[cfg(feature = "metrics")]
            counter!("meetgate_cache_evictions_total", "cache" => self.config.name.clone())
                .increment(1);

            #[cfg(feature = "tracing")]
            debug!(cache = %self.config.name, key = %evicted, "Cache eviction occurred");

            self.config.event_listeners.emit(&CacheEvent::Eviction {
                namespace: evicted.namespace,
                key: evicted.key,
                timestamp: Instant::now(),
            });
        }
    }

    /// Removes a single entry. Returns whether anything was removed.
    pub fn invalidate(&self, namespace: &str, key: &str) -> bool {
        let removed = self.lock().remove(&CacheKey::new(namespace, key));
        if removed {
            self.record_invalidation(namespace, Some(key), 1);
        }
        removed
    }

    /// Removes every entry in `namespace`, returning how many were removed.
    ///
    /// Other namespaces are untouched. No reader can observe a partially
    /// invalidated namespace.
    pub fn invalidate_namespace(&self, namespace: &str) -> usize {
        let removed = self.lock().remove_namespace(namespace);
        self.record_invalidation(namespace, None, removed);
        removed
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.lock().clear();

        #[cfg(feature = "metrics")]
        gauge!("meetgate_cache_size", "cache" => self.config.name.clone()).set(0.0);
    }

    /// Number of stored entries, including expired entries not yet purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Default TTL for a namespace.
    pub fn ttl_for(&self, namespace: &str) -> Duration {
        self.config.ttl_for(namespace)
    }

    fn record_hit(&self, key: &CacheKey) {
        #[cfg(feature = "metrics")]
        counter!("meetgate_cache_requests_total", "cache" => self.config.name.clone(), "result" => "hit")
            .increment(1);

        #[cfg(feature = "tracing")]
        trace!(cache = %self.config.name, key = %key, "Cache hit");

        if !self.config.event_listeners.listens_to(&key.namespace) {
            return;
        }
        self.config.event_listeners.emit(&CacheEvent::Hit {
            namespace: key.namespace.clone(),
            key: key.key.clone(),
            timestamp: Instant::now(),
        });
    }

    fn record_miss(&self, key: &CacheKey, expired: bool) {
        #[cfg(feature = "metrics")]
        counter!("meetgate_cache_requests_total", "cache" => self.config.name.clone(), "result" => "miss")
            .increment(1);

        #[cfg(feature = "tracing")]
        trace!(cache = %self.config.name, key = %key, expired, "Cache miss");

        if !self.config.event_listeners.listens_to(&key.namespace) {
            return;
        }
        let namespace = key.namespace.clone();
        let key = key.key.clone();
        let timestamp = Instant::now();
        let event = if expired {
            CacheEvent::Expired {
                namespace,
                key,
                timestamp,
            }
        } else {
            CacheEvent::Miss {
                namespace,
                key,
                timestamp,
            }
        };
        self.config.event_listeners.emit(&event);
    }

    fn record_invalidation(&self, namespace: &str, key: Option<&str>, removed: usize) {
        #[cfg(feature = "metrics")]
        counter!("meetgate_cache_invalidations_total", "cache" => self.config.name.clone(), "namespace" => namespace.to_string())
            .increment(removed as u64);

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, namespace, key, removed, "Cache invalidated");

        self.config.event_listeners.emit(&CacheEvent::Invalidated {
            namespace: namespace.to_string(),
            key: key.map(str::to_string),
            removed,
            timestamp: Instant::now(),
        });
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("name", &self.config.name)
            .field("len", &self.len())
            .field("max_items", &self.config.max_items)
            .finish()
    }
}
