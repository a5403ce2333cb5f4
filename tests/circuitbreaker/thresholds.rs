use super::{bad_request, server_error};
use meetgate_circuitbreaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::test]
async fn three_failures_open_and_fourth_call_never_reaches_upstream() {
    let breaker = CircuitBreaker::builder().failure_threshold(3).build();
    let upstream = AtomicUsize::new(0);

    for _ in 0..3 {
        let result = breaker
            .call("list_rooms", || async {
                upstream.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(server_error())
            })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::Inner(_))));
    }
    assert_eq!(breaker.state("list_rooms").await, CircuitState::Open);

    let result = breaker
        .call("list_rooms", || async {
            upstream.fetch_add(1, Ordering::SeqCst);
            Ok::<_, io::Error>(())
        })
        .await;

    assert!(matches!(result, Err(CircuitBreakerError::OpenCircuit { ref operation }) if operation == "list_rooms"));
    assert_eq!(upstream.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_errors_never_trip_the_breaker() {
    let breaker = CircuitBreaker::builder().failure_threshold(3).build();

    for _ in 0..10 {
        let result = breaker
            .call("create_room", || async { Err::<(), _>(bad_request()) })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::Inner(_))));
    }

    assert_eq!(breaker.state("create_room").await, CircuitState::Closed);
    let metrics = breaker.metrics("create_room").await.unwrap();
    assert_eq!(metrics.failure_count, 0);
    assert_eq!(metrics.total_calls, 10);
}

#[tokio::test]
async fn failures_must_be_consecutive() {
    let breaker = CircuitBreaker::builder().failure_threshold(3).build();

    for round in 0..5 {
        for _ in 0..2 {
            let _ = breaker
                .call("get_room", || async { Err::<(), _>(server_error()) })
                .await;
        }
        breaker
            .call("get_room", || async { Ok::<_, io::Error>(round) })
            .await
            .unwrap();
    }

    assert_eq!(breaker.state("get_room").await, CircuitState::Closed);
}

#[tokio::test]
async fn operations_have_independent_circuits() {
    let breaker = CircuitBreaker::builder().failure_threshold(2).build();

    for _ in 0..2 {
        let _ = breaker
            .call("list_recordings", || async { Err::<(), _>(server_error()) })
            .await;
    }

    assert!(breaker.is_open("list_recordings").await);
    assert!(!breaker.is_open("list_rooms").await);
    let rooms = breaker
        .call("list_rooms", || async { Ok::<_, io::Error>("rooms") })
        .await
        .unwrap();
    assert_eq!(rooms, "rooms");
}

#[tokio::test]
async fn rejected_calls_are_counted() {
    let rejected = std::sync::Arc::new(AtomicUsize::new(0));
    let r = std::sync::Arc::clone(&rejected);
    let breaker = CircuitBreaker::builder()
        .failure_threshold(1)
        .on_call_rejected(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let _ = breaker
        .call("get_recording", || async { Err::<(), _>(server_error()) })
        .await;
    for _ in 0..4 {
        let _ = breaker
            .call("get_recording", || async { Ok::<_, io::Error>(()) })
            .await;
    }

    assert_eq!(rejected.load(Ordering::SeqCst), 4);
    assert_eq!(
        breaker.metrics("get_recording").await.unwrap().rejected_calls,
        4
    );
}

#[tokio::test]
async fn scoped_transition_listener_sees_only_its_circuit() {
    let opened = std::sync::Arc::new(AtomicUsize::new(0));
    let o = std::sync::Arc::clone(&opened);
    let breaker = CircuitBreaker::builder()
        .failure_threshold(1)
        .on_state_transition_for("delete_room", move |_, to| {
            if to == CircuitState::Open {
                o.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

    for operation in ["get_room", "list_rooms", "delete_room"] {
        let _ = breaker
            .call(operation, || async { Err::<(), _>(server_error()) })
            .await;
    }

    assert!(breaker.is_open("get_room").await);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}
