use super::{client, config, recording_json, room_json};
use meetgate::{ListParams, ROOMS_NAMESPACE};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn repeated_reads_hit_upstream_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rooms/standup"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(room_json("standup", "private")))
        .expect(1)
        .mount(&server)
        .await;
    let client = client(&config(&server));

    for _ in 0..3 {
        let room = client.get_room("standup").await.unwrap();
        assert!(!room.is_degraded);
        assert_eq!(room.data.privacy, "private");
    }

    let cache = client.cache().unwrap();
    assert!(cache.get::<meetgate::Room>(ROOMS_NAMESPACE, "standup").is_some());
}

#[tokio::test]
async fn list_pages_are_cached_per_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rooms"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "data": [room_json("standup", "public")],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rooms"))
        .and(query_param("limit", "1"))
        .and(query_param("starting_after", "id-standup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "data": [room_json("retro", "public")],
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    let client = client(&config(&server));

    let first = ListParams::default().limit(1);
    let second = ListParams::default().limit(1).starting_after("id-standup");
    for _ in 0..2 {
        let page = client.list_rooms(&first).await.unwrap();
        assert_eq!(page.data.data[0].name, "standup");
        let page = client.list_rooms(&second).await.unwrap();
        assert_eq!(page.data.data[0].name, "retro");
    }
}

#[tokio::test]
async fn recordings_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recordings/rec-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(recording_json("rec-1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recordings"))
        .and(query_param("room_name", "standup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "data": [recording_json("rec-1")],
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client(&config(&server));

    let params = ListParams::default().room_name("standup");
    for _ in 0..2 {
        let recording = client.get_recording("rec-1").await.unwrap();
        assert_eq!(recording.data.status, "finished");
        let list = client.list_recordings(&params).await.unwrap();
        assert_eq!(list.data.total_count, 1);
    }
}

#[tokio::test]
async fn expired_entries_are_fetched_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rooms/standup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(room_json("standup", "public")))
        .expect(2)
        .mount(&server)
        .await;
    let mut config = config(&server);
    config.cache.ttl_ms = 50;
    let client = client(&config);

    client.get_room("standup").await.unwrap();
    client.get_room("standup").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(80)).await;
    client.get_room("standup").await.unwrap();
}
