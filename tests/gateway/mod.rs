//! Tests for the resilient client over HTTP.
//!
//! Test organization:
//! - reads.rs: caching of read operations
//! - writes.rs: invalidation after writes, tokens
//! - failures.rs: retries, stale values, fallbacks and the breaker
//! - config.rs: building the stack from configuration

mod config;
mod reads;

use meetgate::{GatewayConfig, HttpRoomsClient, ResilientClient};
use serde_json::{json, Value};
use std::sync::Once;
use wiremock::MockServer;

static TRACING: Once = Once::new();

/// Routes the client's logs through the test harness.
pub(crate) fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Configuration pointing at `server` with short retry delays.
pub(crate) fn config(server: &MockServer) -> GatewayConfig {
    let mut config = GatewayConfig {
        api_key: "test-key".to_string(),
        api_url: server.uri(),
        ..GatewayConfig::default()
    };
    config.degradation.max_retry_attempts = 2;
    config.degradation.initial_retry_delay_ms = 5;
    config.degradation.max_retry_delay_ms = 20;
    config
}

pub(crate) fn client(config: &GatewayConfig) -> ResilientClient<HttpRoomsClient> {
    init_tracing();
    ResilientClient::connect(config).unwrap()
}

pub(crate) fn room_json(name: &str, privacy: &str) -> Value {
    json!({
        "id": format!("id-{name}"),
        "name": name,
        "url": format!("https://meet.example/{name}"),
        "privacy": privacy,
        "created_at": "2024-01-01T00:00:00.000Z",
        "config": {},
    })
}

pub(crate) fn recording_json(id: &str) -> Value {
    json!({
        "id": id,
        "room_name": "standup",
        "status": "finished",
        "start_ts": 1_700_000_000_u64,
        "duration": 1800,
    })
}

pub(crate) fn server_error() -> Value {
    json!({ "error": "server-error", "info": "upstream maintenance" })
}

pub(crate) async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}
