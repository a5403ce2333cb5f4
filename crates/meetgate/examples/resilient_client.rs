//! Runs the resilient client against a local mock of the upstream API.
//!
//! The mock serves one room, then starts failing with 503s so the cache,
//! retry, stale-value and fallback paths can be seen in turn.

use meetgate::{GatewayConfig, ListParams, ResilientClient};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Resilient Client Example");
    println!("========================\n");

    let server = MockServer::start().await;
    let room = json!({
        "id": "id-standup",
        "name": "standup",
        "url": "https://meet.example/standup",
        "privacy": "private",
        "created_at": "2024-01-01T00:00:00.000Z",
        "config": {},
    });
    let healthy = Mock::given(method("GET"))
        .and(path("/rooms/standup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(room))
        .mount_as_scoped(&server)
        .await;

    let mut config = GatewayConfig {
        api_key: "demo-key".to_string(),
        api_url: server.uri(),
        ..GatewayConfig::default()
    };
    config.cache.ttl_ms = 200;
    config.degradation.initial_retry_delay_ms = 50;
    config.circuit_breaker.failure_threshold = 3;

    let client = ResilientClient::connect(&config)?;

    println!("1. Upstream healthy");
    let first = client.get_room("standup").await?;
    println!("  fetched {} (degraded: {})", first.data.name, first.is_degraded);
    let second = client.get_room("standup").await?;
    println!("  again from cache (degraded: {})", second.is_degraded);
    println!("  upstream requests so far: {}", server.received_requests().await.map_or(0, |r| r.len()));

    println!("\n2. Upstream starts failing");
    drop(healthy);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "server-error",
            "info": "maintenance",
        })))
        .mount(&server)
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    let stale = client.get_room("standup").await?;
    println!("  served last known good room (degraded: {})", stale.is_degraded);

    let rooms = client.list_rooms(&ListParams::default()).await?;
    println!(
        "  list_rooms fell back to {} rooms (degraded: {})",
        rooms.data.total_count, rooms.is_degraded
    );

    match client.get_recording("rec-1").await {
        Ok(recording) => println!("  unexpected recording {}", recording.data.id),
        Err(e) => println!("  get_recording: {e}"),
    }

    println!("\n3. State");
    for (operation, state) in client.circuit_states().await {
        println!("  circuit {operation}: {state:?}");
    }
    let health = client.health();
    println!("  health: HTTP {}", health.http_status());
    println!("{}", serde_json::to_string_pretty(&health)?);

    Ok(())
}
