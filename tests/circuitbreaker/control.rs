use super::server_error;
use meetgate_circuitbreaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
use std::io;
use std::time::Duration;

#[tokio::test]
async fn unknown_operations_report_closed() {
    let breaker = CircuitBreaker::default();
    assert_eq!(breaker.state("never_called").await, CircuitState::Closed);
    assert!(breaker.metrics("never_called").await.is_none());
    assert!(breaker.states().await.is_empty());
}

#[tokio::test]
async fn force_open_rejects_until_forced_closed() {
    let breaker = CircuitBreaker::builder()
        .reset_timeout(Duration::from_secs(60))
        .build();

    breaker.force_open("delete_room").await;
    let result = breaker
        .call("delete_room", || async { Ok::<_, io::Error>(()) })
        .await;
    assert!(matches!(result, Err(CircuitBreakerError::OpenCircuit { .. })));

    breaker.force_closed("delete_room").await;
    breaker
        .call("delete_room", || async { Ok::<_, io::Error>(()) })
        .await
        .unwrap();
}

#[tokio::test]
async fn reset_clears_failure_history() {
    let breaker = CircuitBreaker::builder().failure_threshold(3).build();

    for _ in 0..2 {
        let _ = breaker
            .call("get_room", || async { Err::<(), _>(server_error()) })
            .await;
    }
    assert_eq!(breaker.metrics("get_room").await.unwrap().failure_count, 2);

    breaker.reset("get_room").await;
    assert_eq!(breaker.metrics("get_room").await.unwrap().failure_count, 0);

    // two more failures are not enough after the reset
    for _ in 0..2 {
        let _ = breaker
            .call("get_room", || async { Err::<(), _>(server_error()) })
            .await;
    }
    assert_eq!(breaker.state("get_room").await, CircuitState::Closed);
}

#[tokio::test]
async fn states_lists_every_operation_sorted() {
    let breaker = CircuitBreaker::builder().failure_threshold(1).build();

    breaker
        .call("list_rooms", || async { Ok::<_, io::Error>(()) })
        .await
        .unwrap();
    let _ = breaker
        .call("get_recording", || async { Err::<(), _>(server_error()) })
        .await;

    assert_eq!(
        breaker.states().await,
        vec![
            ("get_recording".to_string(), CircuitState::Open),
            ("list_rooms".to_string(), CircuitState::Closed),
        ]
    );

    breaker.reset_all().await;
    assert!(breaker
        .states()
        .await
        .iter()
        .all(|(_, state)| *state == CircuitState::Closed));
}

#[tokio::test]
async fn clones_share_circuits() {
    let breaker = CircuitBreaker::builder().failure_threshold(1).build();
    let clone = breaker.clone();

    let _ = clone
        .call("list_rooms", || async { Err::<(), _>(server_error()) })
        .await;

    assert!(breaker.is_open("list_rooms").await);
}
