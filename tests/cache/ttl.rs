use meetgate_cache::ResponseCache;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn entry_is_present_before_ttl_and_gone_after() {
    let cache = ResponseCache::builder()
        .default_ttl(Duration::from_millis(100))
        .build();

    cache.set("rooms", "a", 1u32, None);

    tokio::time::advance(Duration::from_millis(50)).await;
    assert_eq!(cache.get::<u32>("rooms", "a"), Some(1));

    tokio::time::advance(Duration::from_millis(100)).await;
    assert_eq!(cache.get::<u32>("rooms", "a"), None);
    assert!(cache.is_empty(), "expired entry is purged on read");
}

#[tokio::test(start_paused = true)]
async fn entry_expires_exactly_at_its_deadline() {
    let cache = ResponseCache::builder()
        .default_ttl(Duration::from_millis(100))
        .build();

    cache.set("rooms", "a", 1u32, None);
    tokio::time::advance(Duration::from_millis(100)).await;

    assert_eq!(cache.get::<u32>("rooms", "a"), None);
}

#[tokio::test(start_paused = true)]
async fn namespace_ttl_beats_default_and_override_beats_both() {
    let cache = ResponseCache::builder()
        .default_ttl(Duration::from_secs(60))
        .namespace_ttl("recordings", Duration::from_secs(10))
        .build();

    cache.set("rooms", "r1", "room", None);
    cache.set("recordings", "rec1", "recording", None);
    cache.set("recordings", "rec2", "pinned", Some(Duration::from_secs(120)));

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(cache.get::<&str>("rooms", "r1"), Some("room"));
    assert_eq!(cache.get::<&str>("recordings", "rec1"), None);
    assert_eq!(cache.get::<&str>("recordings", "rec2"), Some("pinned"));

    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(cache.get::<&str>("rooms", "r1"), None);
    assert_eq!(cache.get::<&str>("recordings", "rec2"), Some("pinned"));
}

#[tokio::test(start_paused = true)]
async fn overwrite_restarts_the_clock() {
    let cache = ResponseCache::builder()
        .default_ttl(Duration::from_millis(100))
        .build();

    cache.set("rooms", "a", 1u32, None);
    tokio::time::advance(Duration::from_millis(80)).await;
    cache.set("rooms", "a", 2u32, None);
    tokio::time::advance(Duration::from_millis(80)).await;

    assert_eq!(cache.get::<u32>("rooms", "a"), Some(2));
}

#[tokio::test(start_paused = true)]
async fn expired_reads_count_as_misses() {
    let misses = Arc::new(AtomicUsize::new(0));
    let m = Arc::clone(&misses);
    let cache = ResponseCache::builder()
        .default_ttl(Duration::from_millis(10))
        .on_miss(move |_, _| {
            m.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    cache.set("rooms", "a", 1u32, None);
    tokio::time::advance(Duration::from_millis(20)).await;
    assert_eq!(cache.get::<u32>("rooms", "a"), None);
    assert_eq!(cache.get::<u32>("rooms", "a"), None);

    assert_eq!(misses.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn etag_expires_with_its_entry() {
    let cache = ResponseCache::builder()
        .default_ttl(Duration::from_millis(100))
        .build();

    cache.set_with_etag("rooms", "a", 1u32, "W/\"abc\"", None);
    assert_eq!(cache.etag("rooms", "a").as_deref(), Some("W/\"abc\""));

    tokio::time::advance(Duration::from_millis(150)).await;
    assert_eq!(cache.etag("rooms", "a"), None);
}
