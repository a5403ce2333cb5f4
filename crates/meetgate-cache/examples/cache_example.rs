use meetgate_cache::ResponseCache;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Room {
    name: String,
    privacy: &'static str,
}

#[tokio::main]
async fn main() {
    println!("Response Cache Example");
    println!("======================\n");

    let cache = ResponseCache::builder()
        .name("example-cache")
        .max_items(3)
        .default_ttl(Duration::from_secs(2))
        .namespace_ttl("recordings", Duration::from_millis(500))
        .on_hit(|ns, key| println!("  [EVENT] HIT {ns}:{key}"))
        .on_miss(|ns, key| println!("  [EVENT] MISS {ns}:{key}"))
        .on_eviction(|ns, key| println!("  [EVENT] EVICTED {ns}:{key}"))
        .on_invalidation(|ns, removed| println!("  [EVENT] INVALIDATED {ns} ({removed} entries)"))
        .build();

    println!("1. Populate the rooms namespace");
    for name in ["standup", "retro"] {
        let room = Room {
            name: name.to_string(),
            privacy: "private",
        };
        cache.set("rooms", name, room, None);
    }
    if let Some(room) = cache.get::<Room>("rooms", "standup") {
        println!("  got {} ({})", room.name, room.privacy);
    }

    println!("\n2. Recordings expire sooner");
    cache.set("recordings", "rec-1", String::from("recording payload"), None);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(cache.get::<String>("recordings", "rec-1").is_none());

    println!("\n3. Capacity of 3: the oldest entry is evicted");
    cache.set("rooms", "planning", Room { name: "planning".into(), privacy: "public" }, None);
    cache.set("rooms", "demo", Room { name: "demo".into(), privacy: "public" }, None);

    println!("\n4. A write invalidates the namespace");
    cache.invalidate_namespace("rooms");
    println!("  entries left: {}", cache.len());
}
