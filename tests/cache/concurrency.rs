use meetgate_cache::ResponseCache;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_and_readers() {
    let cache = Arc::new(ResponseCache::builder().max_items(10_000).build());

    let handles: Vec<_> = (0..50u32)
        .map(|task| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..100u32 {
                    let key = format!("{task}-{i}");
                    cache.set("rooms", &key, i, None);
                    assert_eq!(cache.get::<u32>("rooms", &key), Some(i));
                }
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap();
    }
    assert_eq!(cache.len(), 5000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_write_wins_on_the_same_key() {
    let cache = Arc::new(ResponseCache::default());

    let handles: Vec<_> = (0..20u32)
        .map(|value| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.set("rooms", "shared", value, None) })
        })
        .collect();
    for result in futures::future::join_all(handles).await {
        result.unwrap();
    }

    let value = cache.get::<u32>("rooms", "shared").unwrap();
    assert!(value < 20);
    assert_eq!(cache.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invalidation_races_with_writes() {
    let cache = Arc::new(ResponseCache::default());
    for i in 0..100u32 {
        cache.set("rooms", &i.to_string(), i, None);
    }

    let writer = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            for i in 0..100u32 {
                cache.set("recordings", &i.to_string(), i, None);
            }
        })
    };
    let invalidator = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.invalidate_namespace("rooms") })
    };

    writer.await.unwrap();
    assert_eq!(invalidator.await.unwrap(), 100);
    assert_eq!(cache.len(), 100);
}
