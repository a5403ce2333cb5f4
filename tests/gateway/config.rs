use super::{config, init_tracing, request_count, room_json};
use meetgate::{ConfigError, GatewayConfig, HttpRoomsClient, ResilientClient};
use std::collections::HashMap;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn configuration_comes_from_the_environment() {
    let config = GatewayConfig::from_lookup(lookup(&[
        ("MEETGATE_API_KEY", "secret"),
        ("MEETGATE_API_URL", "https://api.meet.example/v1"),
        ("MEETGATE_CACHE_TTL_MS", "60000"),
        ("MEETGATE_CB_FAILURE_THRESHOLD", "3"),
        ("MEETGATE_DEGRADATION_ENABLED", "false"),
    ]))
    .unwrap();

    assert_eq!(config.api_key, "secret");
    assert_eq!(config.api_url, "https://api.meet.example/v1");
    assert_eq!(config.cache.ttl_ms, 60_000);
    assert_eq!(config.circuit_breaker.failure_threshold, 3);
    assert!(!config.degradation.enabled);
    assert_eq!(config.degradation.max_retry_attempts, 3);
}

#[test]
fn missing_api_key_is_an_error() {
    let err = GatewayConfig::from_lookup(lookup(&[])).unwrap_err();
    assert_eq!(err, ConfigError::MissingEnvVar("MEETGATE_API_KEY".to_string()));
}

#[test]
fn serialized_configuration_hides_the_key() {
    let config = GatewayConfig {
        api_key: "secret".to_string(),
        ..GatewayConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(!json.contains("secret"));
}

#[tokio::test]
async fn everything_disabled_is_a_plain_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(room_json("standup", "public")))
        .mount(&server)
        .await;
    let mut config = config(&server);
    config.cache.enabled = false;
    config.circuit_breaker.enabled = false;
    config.degradation.enabled = false;
    init_tracing();
    let client = ResilientClient::connect(&config).unwrap();

    assert!(client.cache().is_none());
    assert!(client.circuit_breaker().is_none());
    assert!(client.coordinator().is_none());

    for _ in 0..2 {
        assert!(!client.get_room("standup").await.unwrap().is_degraded);
    }
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn passthrough_failures_are_not_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let client = ResilientClient::builder(HttpRoomsClient::new("k", server.uri()).unwrap()).build();

    let err = client.get_room("standup").await.unwrap_err();

    assert!(!err.is_degraded());
    assert_eq!(err.api_error().and_then(meetgate::ApiError::status_code), Some(503));
}
