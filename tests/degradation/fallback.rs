use super::{coordinator, unavailable};
use meetgate_cache::ResponseCache;
use meetgate_degradation::{
    DegradationError, ExecuteOptions, FallbackConfig, HealthStatus, Strategy, FALLBACK_NAMESPACE,
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn stale_value_is_served_after_upstream_fails() {
    let cache = Arc::new(ResponseCache::default());
    let coordinator = coordinator().cache(Arc::clone(&cache)).build();
    let up = AtomicBool::new(true);

    let primary = || async {
        if up.load(Ordering::SeqCst) {
            Ok(vec!["standup".to_string()])
        } else {
            Err(unavailable())
        }
    };

    let fresh = coordinator
        .execute_with_fallback("list_rooms", ExecuteOptions::cached("rooms:all"), primary)
        .await
        .unwrap();
    assert!(!fresh.is_degraded);
    assert!(cache.get::<Vec<String>>(FALLBACK_NAMESPACE, "rooms:all").is_some());

    up.store(false, Ordering::SeqCst);
    let stale = coordinator
        .execute_with_fallback("list_rooms", ExecuteOptions::cached("rooms:all"), primary)
        .await
        .unwrap();

    assert!(stale.is_degraded);
    assert_eq!(stale.data, vec!["standup".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn stale_cache_is_preferred_over_the_fallback() {
    let cache = Arc::new(ResponseCache::default());
    let coordinator = coordinator().cache(Arc::clone(&cache)).build();
    coordinator.register_fallback("get_room", FallbackConfig::value("placeholder".to_string()));
    cache.set(FALLBACK_NAMESPACE, "rooms:standup", "standup".to_string(), None);

    let result = coordinator
        .execute_with_fallback("get_room", ExecuteOptions::cached("rooms:standup"), || async {
            Err::<String, _>(unavailable())
        })
        .await
        .unwrap();

    assert_eq!(result.data, "standup");
    assert!(result.is_degraded);
}

#[tokio::test(start_paused = true)]
async fn skip_cache_goes_straight_to_the_fallback() {
    let cache = Arc::new(ResponseCache::default());
    let coordinator = coordinator().cache(Arc::clone(&cache)).build();
    coordinator.register_fallback("get_room", FallbackConfig::value("placeholder".to_string()));
    cache.set(FALLBACK_NAMESPACE, "rooms:standup", "standup".to_string(), None);

    let result = coordinator
        .execute_with_fallback(
            "get_room",
            ExecuteOptions::cached("rooms:standup").skip_cache(),
            || async { Err::<String, _>(unavailable()) },
        )
        .await
        .unwrap();

    assert_eq!(result.data, "placeholder");
}

#[tokio::test(start_paused = true)]
async fn fallback_value_is_served_when_nothing_is_cached() {
    let coordinator = coordinator().build();
    coordinator.register_fallback("list_rooms", FallbackConfig::value(Vec::<String>::new()));

    let result = coordinator
        .execute_with_fallback("list_rooms", ExecuteOptions::default(), || async {
            Err::<Vec<String>, _>(unavailable())
        })
        .await
        .unwrap();

    assert!(result.data.is_empty());
    assert!(result.is_degraded);
}

#[tokio::test(start_paused = true)]
async fn fallback_of_another_type_is_ignored() {
    let coordinator = coordinator().build();
    coordinator.register_fallback("list_rooms", FallbackConfig::value(0_u64));

    let err = coordinator
        .execute_with_fallback("list_rooms", ExecuteOptions::default(), || async {
            Err::<Vec<String>, _>(unavailable())
        })
        .await
        .unwrap_err();

    assert!(err.is_degraded());
    assert!(!coordinator.has_fallback::<Vec<String>>("list_rooms"));
    assert!(coordinator.has_fallback::<u64>("list_rooms"));
}

#[tokio::test(start_paused = true)]
async fn critical_fallback_failure_is_severe() {
    let coordinator = coordinator().build();
    coordinator.register_fallback(
        "generate_room_token",
        FallbackConfig::new(|| async {
            Err::<String, _>(io::Error::other("token service offline"))
        })
        .critical(),
    );

    let err = coordinator
        .execute_with_fallback("generate_room_token", ExecuteOptions::default(), || async {
            Err::<String, _>(unavailable())
        })
        .await
        .unwrap_err();

    match err {
        DegradationError::Degraded {
            attempted_strategies,
            status,
            ..
        } => {
            assert_eq!(status, HealthStatus::SeverelyDegraded);
            assert_eq!(attempted_strategies, vec![Strategy::Retry, Strategy::Fallback]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn non_critical_fallback_failure_is_unavailable() {
    let cache = Arc::new(ResponseCache::default());
    let coordinator = coordinator().cache(cache).build();
    coordinator.register_fallback(
        "get_room",
        FallbackConfig::new(|| async { Err::<String, _>(io::Error::other("no placeholder")) }),
    );

    let err = coordinator
        .execute_with_fallback("get_room", ExecuteOptions::cached("rooms:gone"), || async {
            Err::<String, _>(unavailable())
        })
        .await
        .unwrap_err();

    match err {
        DegradationError::Degraded {
            attempted_strategies,
            status,
            ..
        } => {
            assert_eq!(status, HealthStatus::Unavailable);
            assert_eq!(
                attempted_strategies,
                vec![Strategy::Retry, Strategy::Cache, Strategy::Fallback]
            );
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn fallback_ttl_bounds_last_known_good_values() {
    let cache = Arc::new(ResponseCache::default());
    let coordinator = coordinator().cache(Arc::clone(&cache)).build();
    coordinator.register_fallback(
        "get_room",
        FallbackConfig::value(String::new()).cache_ttl(Duration::from_secs(5)),
    );

    coordinator
        .execute_with_fallback("get_room", ExecuteOptions::cached("rooms:standup"), || async {
            Ok::<_, io::Error>("standup".to_string())
        })
        .await
        .unwrap();
    assert!(cache.get::<String>(FALLBACK_NAMESPACE, "rooms:standup").is_some());

    tokio::time::advance(Duration::from_secs(6)).await;
    let result = coordinator
        .execute_with_fallback("get_room", ExecuteOptions::cached("rooms:standup"), || async {
            Err::<String, _>(unavailable())
        })
        .await
        .unwrap();
    assert_eq!(result.data, "");
}

#[tokio::test(start_paused = true)]
async fn explicit_ttl_overrides_the_fallback_ttl() {
    let cache = Arc::new(ResponseCache::default());
    let coordinator = coordinator().cache(Arc::clone(&cache)).build();
    coordinator.register_fallback(
        "get_room",
        FallbackConfig::value(String::new()).cache_ttl(Duration::from_secs(5)),
    );

    coordinator
        .execute_with_fallback(
            "get_room",
            ExecuteOptions::cached("rooms:standup").ttl(Duration::from_secs(60)),
            || async { Ok::<_, io::Error>("standup".to_string()) },
        )
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(6)).await;
    let result = coordinator
        .execute_with_fallback("get_room", ExecuteOptions::cached("rooms:standup"), || async {
            Err::<String, _>(unavailable())
        })
        .await
        .unwrap();
    assert_eq!(result.data, "standup");
    assert!(result.is_degraded);
}
