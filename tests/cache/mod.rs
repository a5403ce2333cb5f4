//! Tests for the response cache.
//!
//! Test organization:
//! - ttl.rs: expiry, per-namespace TTLs and overrides
//! - invalidation.rs: point and namespace invalidation
//! - eviction.rs: capacity limits under FIFO and LRU
//! - concurrency.rs: shared access from many tasks

mod concurrency;
mod eviction;
mod invalidation;
mod ttl;
