use super::{coordinator, unavailable};
use meetgate_circuitbreaker::{CircuitBreaker, CircuitBreakerError};
use meetgate_degradation::{DegradationError, ExecuteOptions, FallbackConfig, Strategy};
use std::sync::atomic::{AtomicU32, Ordering};

#[tokio::test(start_paused = true)]
async fn retries_go_through_the_breaker_until_it_opens() {
    let breaker = CircuitBreaker::builder().failure_threshold(2).build();
    let coordinator = coordinator().max_retry_attempts(5).build();
    let upstream = AtomicU32::new(0);

    let err = coordinator
        .execute_with_fallback("get_room", ExecuteOptions::default(), || {
            breaker.call("get_room", || async {
                upstream.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(unavailable())
            })
        })
        .await
        .unwrap_err();

    // two failures open the circuit, the third attempt is rejected and ends the retries
    assert_eq!(upstream.load(Ordering::SeqCst), 2);
    assert!(breaker.is_open("get_room").await);
    match err {
        DegradationError::Degraded { last_error, .. } => {
            assert!(matches!(last_error, CircuitBreakerError::OpenCircuit { .. }))
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn open_circuit_falls_back_without_retrying() {
    let breaker = CircuitBreaker::default();
    breaker.force_open("list_rooms").await;
    let retries = std::sync::Arc::new(AtomicU32::new(0));
    let r = std::sync::Arc::clone(&retries);
    let coordinator = coordinator()
        .on_retry(move |_, _, _| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    coordinator.register_fallback("list_rooms", FallbackConfig::value(Vec::<String>::new()));

    let result = coordinator
        .execute_with_fallback("list_rooms", ExecuteOptions::default(), || {
            breaker.call("list_rooms", || async {
                Ok::<_, std::io::Error>(vec!["unreachable".to_string()])
            })
        })
        .await
        .unwrap();

    assert!(result.is_degraded);
    assert!(result.data.is_empty());
    assert_eq!(retries.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn open_circuit_without_fallback_reports_no_retry() {
    let breaker = CircuitBreaker::default();
    breaker.force_open("get_recording").await;
    let coordinator = coordinator().build();

    let err = coordinator
        .execute_with_fallback("get_recording", ExecuteOptions::default(), || {
            breaker.call("get_recording", || async { Ok::<_, std::io::Error>(()) })
        })
        .await
        .unwrap_err();

    match err {
        DegradationError::Degraded {
            attempted_strategies,
            ..
        } => assert!(!attempted_strategies.contains(&Strategy::Retry)),
        other => panic!("unexpected {other:?}"),
    }
}
