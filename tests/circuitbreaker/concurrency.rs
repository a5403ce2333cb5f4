use super::server_error;
use meetgate_circuitbreaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 100 concurrent calls hitting a closed circuit
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_closed_circuit() {
    let breaker = CircuitBreaker::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let breaker = breaker.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                breaker
                    .call("list_rooms", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, io::Error>(())
                    })
                    .await
            })
        })
        .collect();

    let successes = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(()))))
        .count();

    assert_eq!(successes, 100);
    assert_eq!(calls.load(Ordering::SeqCst), 100);
    assert_eq!(
        breaker.metrics("list_rooms").await.unwrap().total_calls,
        100
    );
}

/// Concurrent failures open the circuit exactly once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_open_once() {
    let opened = Arc::new(AtomicUsize::new(0));
    let o = Arc::clone(&opened);
    let breaker = CircuitBreaker::builder()
        .failure_threshold(5)
        .on_state_transition(move |_, _, to| {
            if to == CircuitState::Open {
                o.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let breaker = breaker.clone();
            tokio::spawn(async move {
                breaker
                    .call("get_room", || async { Err::<(), _>(server_error()) })
                    .await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let reached_upstream = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(CircuitBreakerError::Inner(_)))))
        .count();

    assert!(reached_upstream >= 5);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.state("get_room").await, CircuitState::Open);
}
