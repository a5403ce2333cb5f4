use meetgate_cache::{EvictionPolicy, ResponseCache};
use std::sync::{Arc, Mutex};

#[test]
fn fifo_evicts_oldest_insert_even_if_recently_read() {
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&evicted);
    let cache = ResponseCache::builder()
        .max_items(2)
        .on_eviction(move |namespace, key| {
            e.lock().unwrap().push(format!("{namespace}:{key}"));
        })
        .build();

    cache.set("rooms", "a", 1u8, None);
    cache.set("rooms", "b", 2u8, None);
    assert_eq!(cache.get::<u8>("rooms", "a"), Some(1));
    cache.set("rooms", "c", 3u8, None);

    assert_eq!(cache.get::<u8>("rooms", "a"), None);
    assert_eq!(cache.get::<u8>("rooms", "b"), Some(2));
    assert_eq!(cache.get::<u8>("rooms", "c"), Some(3));
    assert_eq!(*evicted.lock().unwrap(), vec!["rooms:a".to_string()]);
}

#[test]
fn lru_keeps_recently_read_entries() {
    let cache = ResponseCache::builder()
        .max_items(2)
        .eviction_policy(EvictionPolicy::Lru)
        .build();

    cache.set("rooms", "a", 1u8, None);
    cache.set("rooms", "b", 2u8, None);
    assert_eq!(cache.get::<u8>("rooms", "a"), Some(1));
    cache.set("rooms", "c", 3u8, None);

    assert_eq!(cache.get::<u8>("rooms", "a"), Some(1));
    assert_eq!(cache.get::<u8>("rooms", "b"), None);
}

#[test]
fn overwriting_at_capacity_does_not_evict() {
    let cache = ResponseCache::builder().max_items(2).build();

    cache.set("rooms", "a", 1u8, None);
    cache.set("rooms", "b", 2u8, None);
    cache.set("rooms", "a", 10u8, None);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get::<u8>("rooms", "a"), Some(10));
    assert_eq!(cache.get::<u8>("rooms", "b"), Some(2));
}

#[test]
fn capacity_is_shared_across_namespaces() {
    let cache = ResponseCache::builder().max_items(3).build();

    for i in 0..10u8 {
        let namespace = if i % 2 == 0 { "rooms" } else { "recordings" };
        cache.set(namespace, &i.to_string(), i, None);
    }

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.get::<u8>("recordings", "9"), Some(9));
    assert_eq!(cache.get::<u8>("rooms", "0"), None);
}
