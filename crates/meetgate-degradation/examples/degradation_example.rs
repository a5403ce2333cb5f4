use meetgate_cache::ResponseCache;
use meetgate_degradation::{DegradationCoordinator, ExecuteOptions, FallbackConfig};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    println!("Graceful Degradation Example");
    println!("============================\n");

    let cache = Arc::new(ResponseCache::default());
    let coordinator = DegradationCoordinator::builder()
        .name("rooms-api")
        .max_retry_attempts(2)
        .initial_retry_delay(Duration::from_millis(50))
        .cache(Arc::clone(&cache))
        .on_retry(|op, attempt, delay| println!("  [EVENT] {op}: retry {attempt} in {delay:?}"))
        .on_fallback(|op, strategy| println!("  [EVENT] {op}: served from {strategy}"))
        .on_health_change(|op, from, to| println!("  [EVENT] {op}: {from} -> {to}"))
        .build();

    coordinator.register_fallback(
        "list_rooms",
        FallbackConfig::value(vec!["lobby".to_string()]),
    );

    let upstream_up = Arc::new(AtomicBool::new(true));
    let list_rooms = || {
        let up = Arc::clone(&upstream_up);
        async move {
            if up.load(Ordering::SeqCst) {
                Ok(vec!["standup".to_string(), "retro".to_string()])
            } else {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "503 upstream"))
            }
        }
    };

    println!("1. Upstream healthy");
    let rooms = coordinator
        .execute_with_fallback("list_rooms", ExecuteOptions::cached("all"), list_rooms)
        .await;
    println!("  {rooms:?}\n");

    println!("2. Upstream down: the last good list is served");
    upstream_up.store(false, Ordering::SeqCst);
    let rooms = coordinator
        .execute_with_fallback("list_rooms", ExecuteOptions::cached("all"), list_rooms)
        .await;
    println!("  {rooms:?}\n");

    println!("3. Upstream down, no cached value: the registered fallback is served");
    let rooms = coordinator
        .execute_with_fallback("list_rooms", ExecuteOptions::default(), list_rooms)
        .await;
    println!("  {rooms:?}\n");

    println!("4. Upstream down, nothing to fall back on");
    let room = coordinator
        .execute_with_fallback("get_room", ExecuteOptions::default(), || async {
            Err::<String, _>(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
        })
        .await;
    match room {
        Ok(room) => println!("  {room:?}"),
        Err(e) => println!("  error: {e}"),
    }

    let report = coordinator.health();
    println!("\nOverall health: {} (HTTP {})", report.overall, report.http_status());
    for record in report.components {
        println!(
            "  {}: {} ({} errors)",
            record.name, record.status, record.error_count
        );
    }
}
