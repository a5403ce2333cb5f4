//! Cache storage implementation.

use crate::eviction::{EvictionPolicy, EvictionStore, FifoStore, LruStore};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Composite key: a namespace plus a key within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub(crate) namespace: String,
    pub(crate) key: String,
}

impl CacheKey {
    pub(crate) fn new(namespace: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}

pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

/// Entry in the cache with expiry tracking.
#[derive(Clone)]
pub(crate) struct CacheEntry {
    pub(crate) value: AnyValue,
    expires_at: Instant,
    pub(crate) etag: Option<String>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of a store lookup.
pub(crate) enum Lookup {
    Hit(CacheEntry),
    Miss,
    /// The entry had expired and was purged.
    Expired,
}

/// Cache store with configurable eviction policy and per-entry expiry.
pub(crate) struct CacheStore {
    store: Box<dyn EvictionStore<CacheKey, CacheEntry>>,
}

impl CacheStore {
    /// Creates a new cache store with the given capacity and eviction policy.
    pub(crate) fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        let store: Box<dyn EvictionStore<CacheKey, CacheEntry>> = match policy {
            EvictionPolicy::Lru => Box::new(LruStore::new(capacity)),
            EvictionPolicy::Fifo => Box::new(FifoStore::new(capacity)),
        };

        Self { store }
    }

    /// Looks up a key, purging it if expired.
    pub(crate) fn get(&mut self, key: &CacheKey) -> Lookup {
        let now = Instant::now();
        match self.store.get(key) {
            None => return Lookup::Miss,
            Some(entry) if !entry.is_expired(now) => return Lookup::Hit(entry.clone()),
            Some(_) => {}
        }

        self.store.remove(key);
        Lookup::Expired
    }

    /// Inserts a value that expires after `ttl`.
    /// Returns the key evicted to make room, if any.
    pub(crate) fn insert(
        &mut self,
        key: CacheKey,
        value: AnyValue,
        ttl: Duration,
        etag: Option<String>,
    ) -> Option<CacheKey> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
            etag,
        };
        self.store.insert(key, entry).map(|(evicted, _)| evicted)
    }

    pub(crate) fn remove(&mut self, key: &CacheKey) -> bool {
        self.store.remove(key).is_some()
    }

    /// Removes every entry in `namespace`.
    pub(crate) fn remove_namespace(&mut self, namespace: &str) -> usize {
        self.store.remove_where(&|k: &CacheKey| k.namespace == namespace)
    }

    /// Returns the current number of entries, including expired ones not yet purged.
    pub(crate) fn len(&self) -> usize {
        self.store.len()
    }

    pub(crate) fn clear(&mut self) {
        self.store.clear();
    }
}
