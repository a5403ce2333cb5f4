use meetgate_circuitbreaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
use std::io;
use std::time::Duration;

fn breaker() -> CircuitBreaker {
    CircuitBreaker::builder()
        .failure_threshold(2)
        .initial_request_timeout(Duration::from_secs(30))
        .request_timeout(Duration::from_secs(10))
        .build()
}

async fn slow_call(breaker: &CircuitBreaker, delay: Duration) -> Result<(), CircuitBreakerError<io::Error>> {
    breaker
        .call("list_rooms", || async move {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn first_call_gets_the_longer_timeout() {
    let breaker = breaker();

    // 20s would exceed the steady-state timeout but not the initial one
    slow_call(&breaker, Duration::from_secs(20)).await.unwrap();

    let err = slow_call(&breaker, Duration::from_secs(20)).await.unwrap_err();
    match err {
        CircuitBreakerError::Timeout { operation, after } => {
            assert_eq!(operation, "list_rooms");
            assert_eq!(after, Duration::from_secs(10));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn timeouts_count_as_failures() {
    let breaker = breaker();
    slow_call(&breaker, Duration::ZERO).await.unwrap();

    for _ in 0..2 {
        let err = slow_call(&breaker, Duration::from_secs(60)).await.unwrap_err();
        assert!(err.is_timeout());
    }

    assert_eq!(breaker.state("list_rooms").await, CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn timeout_cancels_the_call() {
    let breaker = breaker();
    let finished = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let f = std::sync::Arc::clone(&finished);

    let result = breaker
        .call("get_room", || async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            f.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok::<_, io::Error>(())
        })
        .await;

    assert!(result.unwrap_err().is_timeout());
    tokio::time::advance(Duration::from_secs(120)).await;
    assert!(!finished.load(std::sync::atomic::Ordering::SeqCst));
}
