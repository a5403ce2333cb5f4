//! Property tests for the response cache.
//!
//! Invariants tested:
//! - The cache never holds more than `max_items` entries
//! - FIFO eviction keeps exactly the newest keys
//! - Entries are readable before their TTL and gone at it

use meetgate_cache::{EvictionPolicy, ResponseCache};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: size stays bounded and the newest keys survive
    #[test]
    fn fifo_keeps_the_newest_keys(max_items in 1usize..=20, inserts in 1usize..=60) {
        let cache = ResponseCache::builder()
            .max_items(max_items)
            .eviction_policy(EvictionPolicy::Fifo)
            .build();

        for i in 0..inserts {
            cache.set("rooms", &format!("room-{i}"), i, None);
            prop_assert!(cache.len() <= max_items);
        }

        let kept = inserts.min(max_items);
        prop_assert_eq!(cache.len(), kept);
        for i in 0..inserts {
            let present = cache.get::<usize>("rooms", &format!("room-{i}")).is_some();
            prop_assert_eq!(present, i >= inserts - kept, "room-{}", i);
        }
    }

    /// Property: LRU never exceeds capacity either, whatever the access pattern
    #[test]
    fn lru_is_bounded(
        max_items in 1usize..=10,
        ops in proptest::collection::vec((any::<bool>(), 0u8..20), 1..100),
    ) {
        let cache = ResponseCache::builder()
            .max_items(max_items)
            .eviction_policy(EvictionPolicy::Lru)
            .build();

        for (write, key) in ops {
            let key = key.to_string();
            if write {
                cache.set("recordings", &key, key.clone(), None);
            } else {
                let _ = cache.get::<String>("recordings", &key);
            }
            prop_assert!(cache.len() <= max_items);
        }
    }

    /// Property: an entry lives exactly as long as its TTL
    #[test]
    fn entries_expire_at_their_ttl(ttl_ms in 1u64..=10_000, fraction in 0.0f64..1.0) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        rt.block_on(async {
            let cache = ResponseCache::default();
            let ttl = Duration::from_millis(ttl_ms);
            cache.set("rooms", "standup", 1u8, Some(ttl));

            let before = Duration::from_millis((ttl_ms as f64 * fraction) as u64);
            tokio::time::advance(before).await;
            prop_assert!(before < ttl);
            prop_assert_eq!(cache.get::<u8>("rooms", "standup"), Some(1));

            tokio::time::advance(ttl - before).await;
            prop_assert_eq!(cache.get::<u8>("rooms", "standup"), None);

            Ok(())
        })?;
    }
}
