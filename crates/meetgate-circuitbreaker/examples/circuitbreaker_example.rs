use meetgate_circuitbreaker::{CircuitBreaker, CircuitBreakerError};
use meetgate_core::{Classify, ErrorKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct UpstreamStatus(u16);

impl Classify for UpstreamStatus {
    fn kind(&self) -> ErrorKind {
        ErrorKind::from_status(self.0)
    }
}

#[tokio::main]
async fn main() {
    println!("Circuit Breaker Example");
    println!("=======================\n");

    let breaker = CircuitBreaker::builder()
        .name("rooms-api")
        .failure_threshold(3)
        .success_threshold(1)
        .reset_timeout(Duration::from_millis(500))
        .request_timeout(Duration::from_millis(200))
        .on_state_transition(|op, from, to| println!("  [EVENT] {op}: {from:?} -> {to:?}"))
        .on_call_rejected(|op| println!("  [EVENT] {op}: rejected"))
        .build();

    let attempts = Arc::new(AtomicUsize::new(0));

    println!("1. Upstream returns 503 five times in a row");
    for _ in 0..5 {
        let attempts = Arc::clone(&attempts);
        let result = breaker
            .call("list_rooms", || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(UpstreamStatus(503))
            })
            .await;
        match result {
            Err(CircuitBreakerError::OpenCircuit { .. }) => println!("  fast-failed"),
            Err(e) => println!("  upstream error: {:?}", e.into_inner()),
            Ok(()) => unreachable!(),
        }
    }
    println!("  upstream saw {} calls", attempts.load(Ordering::SeqCst));

    println!("\n2. 404s never trip the circuit");
    for _ in 0..5 {
        let _ = breaker
            .call("get_room", || async { Err::<(), _>(UpstreamStatus(404)) })
            .await;
    }
    println!("  get_room is {:?}", breaker.state("get_room").await);

    println!("\n3. Wait out the reset timeout and recover");
    tokio::time::sleep(Duration::from_millis(600)).await;
    let result = breaker
        .call("list_rooms", || async { Ok::<_, UpstreamStatus>("rooms") })
        .await;
    println!("  trial call: {:?}", result.ok());

    println!("\nFinal states: {:?}", breaker.states().await);
}
