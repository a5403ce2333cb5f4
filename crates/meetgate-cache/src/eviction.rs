//! Cache eviction policies.
//!
//! This module defines the strategies for choosing which entry to drop
//! when the cache is full and a new key is inserted.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Eviction policy for the cache.
///
/// Determines which entry to evict when the cache reaches capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// First In, First Out - evicts the oldest inserted entry regardless of
    /// access pattern. Overwriting a key keeps its original position.
    ///
    /// This is the default. A frequently read entry is evicted as soon as
    /// it becomes the oldest.
    #[default]
    Fifo,

    /// Least Recently Used - evicts the entry that was read or written
    /// longest ago. Opt-in only; changes which entries survive under load.
    Lru,
}

/// Storage with a particular eviction strategy.
pub(crate) trait EvictionStore<K, V>: Send {
    /// Gets a value from the store.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Inserts a value, overwriting any existing entry for the key.
    /// Returns the entry that was evicted to make room, if any.
    fn insert(&mut self, key: K, value: V) -> Option<(K, V)>;

    /// Removes a specific key.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Removes every entry whose key matches `predicate`, returning how many were removed.
    fn remove_where(&mut self, predicate: &dyn Fn(&K) -> bool) -> usize;

    /// Returns the current number of entries.
    fn len(&self) -> usize;

    /// Clears all entries.
    fn clear(&mut self);
}

/// FIFO (First In, First Out) storage.
pub(crate) struct FifoStore<K, V> {
    data: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> FifoStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl<K: Hash + Eq + Clone + Send, V: Send> EvictionStore<K, V> for FifoStore<K, V> {
    fn get(&mut self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        // Overwrite in place without changing insertion order
        if let Some(slot) = self.data.get_mut(&key) {
            *slot = value;
            return None;
        }

        let evicted = if self.data.len() >= self.capacity {
            self.order.pop_front().and_then(|old_key| {
                let old_value = self.data.remove(&old_key)?;
                Some((old_key, old_value))
            })
        } else {
            None
        };

        self.data.insert(key.clone(), value);
        self.order.push_back(key);

        evicted
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.data.remove(key)?;
        self.order.retain(|k| k != key);
        Some(value)
    }

    fn remove_where(&mut self, predicate: &dyn Fn(&K) -> bool) -> usize {
        let before = self.data.len();
        self.data.retain(|k, _| !predicate(k));
        self.order.retain(|k| !predicate(k));
        before - self.data.len()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        self.data.clear();
        self.order.clear();
    }
}

/// LRU (Least Recently Used) storage.
pub(crate) struct LruStore<K, V> {
    cache: lru::LruCache<K, V>,
}

impl<K: Hash + Eq, V> LruStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: lru::LruCache::new(cap),
        }
    }
}

impl<K: Hash + Eq + Clone + Send, V: Send> EvictionStore<K, V> for LruStore<K, V> {
    fn get(&mut self, key: &K) -> Option<&V> {
        self.cache.get(key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.cache.contains(&key) {
            self.cache.put(key, value);
            return None;
        }
        self.cache.push(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.cache.pop(key)
    }

    fn remove_where(&mut self, predicate: &dyn Fn(&K) -> bool) -> usize {
        let doomed: Vec<K> = self
            .cache
            .iter()
            .filter(|(k, _)| predicate(*k))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.cache.pop(key);
        }
        doomed.len()
    }

    fn len(&self) -> usize {
        self.cache.len()
    }

    fn clear(&mut self) {
        self.cache.clear();
    }
}
