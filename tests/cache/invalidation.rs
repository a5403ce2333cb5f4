use meetgate_cache::ResponseCache;
use std::sync::{Arc, Mutex};

#[test]
fn namespace_invalidation_removes_only_that_namespace() {
    let cache = ResponseCache::default();
    for key in ["a", "b", "c"] {
        cache.set("rooms", key, key.to_string(), None);
    }
    cache.set("recordings", "a", "rec".to_string(), None);

    assert_eq!(cache.invalidate_namespace("rooms"), 3);

    for key in ["a", "b", "c"] {
        assert_eq!(cache.get::<String>("rooms", key), None);
    }
    assert_eq!(cache.get::<String>("recordings", "a"), Some("rec".to_string()));
    assert_eq!(cache.len(), 1);
}

#[test]
fn namespace_is_not_a_prefix_match() {
    let cache = ResponseCache::default();
    cache.set("rooms", "a", 1u8, None);
    cache.set("rooms_archive", "a", 2u8, None);

    cache.invalidate_namespace("rooms");

    assert_eq!(cache.get::<u8>("rooms_archive", "a"), Some(2));
}

#[test]
fn point_invalidation_is_a_noop_when_absent() {
    let cache = ResponseCache::default();
    cache.set("rooms", "a", 1u8, None);

    assert!(!cache.invalidate("rooms", "missing"));
    assert!(cache.invalidate("rooms", "a"));
    assert!(!cache.invalidate("rooms", "a"));
    assert!(cache.is_empty());
}

#[test]
fn invalidation_listener_sees_removed_count() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let cache = ResponseCache::builder()
        .on_invalidation(move |namespace, removed| {
            s.lock().unwrap().push((namespace.to_string(), removed));
        })
        .build();

    cache.set("rooms", "a", 1u8, None);
    cache.set("rooms", "b", 1u8, None);
    cache.invalidate_namespace("rooms");
    cache.invalidate_namespace("recordings");

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("rooms".to_string(), 2), ("recordings".to_string(), 0)]
    );
}

#[test]
fn clear_empties_everything() {
    let cache = ResponseCache::default();
    cache.set("rooms", "a", 1u8, None);
    cache.set("recordings", "b", 1u8, None);

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.get::<u8>("rooms", "a"), None);
}
