//! Per-operation circuit breakers.
//!
//! A [`CircuitBreaker`] keeps one independent state machine for every
//! operation name it sees (`list_rooms`, `get_room`, ...). A burst of
//! failures on one endpoint opens only that endpoint's circuit; the rest of
//! the API keeps flowing.
//!
//! ## States
//!
//! - **Closed**: calls pass through. Consecutive breaker failures are
//!   counted; reaching `failure_threshold` opens the circuit. Any success
//!   resets the count.
//! - **Open**: calls fail fast with [`CircuitBreakerError::OpenCircuit`] and
//!   never reach upstream. After `reset_timeout` has elapsed since the last
//!   failure the next call moves the circuit to half-open.
//! - **HalfOpen**: at most `success_threshold` trial calls are admitted.
//!   That many successes close the circuit; any failure reopens it and
//!   restarts the reset timer.
//!
//! ## Failure classification
//!
//! Only errors whose [`Classify::kind`] is
//! [`ErrorKind::TransientUpstream`](meetgate_core::ErrorKind::TransientUpstream)
//! count against the circuit: timeouts, network errors and 5xx responses.
//! Authentication, validation and not-found errors are the caller's problem
//! and are recorded as successful round trips.
//!
//! ## Timeouts
//!
//! Every call runs under a timeout. The very first call of an operation gets
//! `initial_request_timeout` (cold connections, TLS setup); every later call
//! gets `request_timeout`. A timed out call is cancelled and counts as a
//! failure.
//!
//! ## Basic Example
//!
//! ```rust
//! use meetgate_circuitbreaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let breaker = CircuitBreaker::builder()
//!     .failure_threshold(3)
//!     .reset_timeout(Duration::from_secs(30))
//!     .on_state_transition(|op, from, to| println!("{op}: {from:?} -> {to:?}"))
//!     .build();
//!
//! for _ in 0..3 {
//!     let result = breaker
//!         .call("list_rooms", || async {
//!             Err::<(), _>(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
//!         })
//!         .await;
//!     assert!(matches!(result, Err(CircuitBreakerError::Inner(_))));
//! }
//!
//! assert_eq!(breaker.state("list_rooms").await, CircuitState::Open);
//! // other operations are unaffected
//! assert_eq!(breaker.state("get_room").await, CircuitState::Closed);
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `metrics`: enables metrics collection using the `metrics` crate
//! - `tracing`: enables logging and tracing using the `tracing` crate
//! - `serde`: enables `Serialize` for `CircuitState` and `CircuitMetrics`

use crate::circuit::{lock, Admission, Circuit};
use meetgate_core::Classify;
#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge, describe_histogram};
use std::collections::HashMap;
use std::future::Future;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
#[cfg(feature = "tracing")]
use tracing::debug;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::{CircuitBreakerLayer, CircuitBreakerService};

mod circuit;
mod config;
mod error;
mod events;
mod layer;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

type CircuitMap = HashMap<String, Arc<Mutex<Circuit>>>;

/// A registry of per-operation circuits sharing one configuration.
///
/// Cloning is cheap and every clone sees the same circuits.
#[derive(Clone)]
pub struct CircuitBreaker {
    config: Arc<CircuitBreakerConfig>,
    circuits: Arc<Mutex<CircuitMap>>,
}

impl CircuitBreaker {
    /// Creates a breaker from a configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "meetgate_circuitbreaker_calls_total",
                    "Total number of calls through the circuit breaker"
                );
                describe_counter!(
                    "meetgate_circuitbreaker_transitions_total",
                    "Total number of circuit breaker state transitions"
                );
                describe_counter!(
                    "meetgate_circuitbreaker_timeouts_total",
                    "Total number of calls cancelled by the circuit breaker timeout"
                );
                describe_gauge!(
                    "meetgate_circuitbreaker_state",
                    "Current circuit state (0 closed, 1 half-open, 2 open)"
                );
                describe_histogram!(
                    "meetgate_circuitbreaker_call_duration_seconds",
                    "Duration of calls through the circuit breaker"
                );
            });
        }

        Self {
            config: Arc::new(config),
            circuits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a builder for a new breaker.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// The configuration shared by every circuit.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn circuits(&self) -> MutexGuard<'_, CircuitMap> {
        self.circuits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the circuit for `operation`, creating a closed one on first use.
    fn circuit(&self, operation: &str) -> Arc<Mutex<Circuit>> {
        let mut circuits = self.circuits();
        let circuit = circuits
            .entry(operation.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Circuit::new(operation))));
        Arc::clone(circuit)
    }

    fn existing(&self, operation: &str) -> Option<Arc<Mutex<Circuit>>> {
        self.circuits().get(operation).cloned()
    }

    /// Runs `f` under the circuit for `operation`.
    ///
    /// Returns [`CircuitBreakerError::OpenCircuit`] without invoking `f` when
    /// the circuit rejects the call, and [`CircuitBreakerError::Timeout`] when
    /// the call outlives its timeout. Dropping the returned future before it
    /// completes records no outcome and frees any half-open trial slot.
    pub async fn call<T, E, F, Fut>(
        &self,
        operation: &str,
        f: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let circuit = self.circuit(operation);

        let (timeout, admission) = {
            let mut guard = lock(&circuit);
            if !guard.try_acquire(&self.config) {
                #[cfg(feature = "tracing")]
                debug!(breaker = %self.config.name, operation, "Circuit open; call rejected");

                return Err(CircuitBreakerError::OpenCircuit {
                    operation: operation.to_string(),
                });
            }
            let timeout = guard.begin_call(&self.config);
            (timeout, Admission::new(Arc::clone(&circuit), guard.epoch()))
        };

        let start = tokio::time::Instant::now();
        let outcome = tokio::time::timeout(timeout, f()).await;
        let duration = start.elapsed();

        admission.settle();
        let mut circuit = lock(&circuit);
        match outcome {
            Ok(Ok(value)) => {
                circuit.record_success(&self.config, duration);
                Ok(value)
            }
            Ok(Err(err)) => {
                if err.kind().counts_as_failure() {
                    circuit.record_failure(&self.config, duration);
                } else {
                    circuit.record_success(&self.config, duration);
                }
                Err(CircuitBreakerError::Inner(err))
            }
            Err(_elapsed) => {
                #[cfg(feature = "tracing")]
                debug!(breaker = %self.config.name, operation, timeout_ms = timeout.as_millis() as u64, "Call timed out");

                #[cfg(feature = "metrics")]
                metrics::counter!("meetgate_circuitbreaker_timeouts_total", "breaker" => self.config.name.clone(), "operation" => operation.to_string())
                    .increment(1);

                self.config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::Timeout {
                        operation: operation.to_string(),
                        timestamp: std::time::Instant::now(),
                        after: timeout,
                    });
                circuit.record_failure(&self.config, duration);
                Err(CircuitBreakerError::Timeout {
                    operation: operation.to_string(),
                    after: timeout,
                })
            }
        }
    }

    /// Returns the state of `operation`'s circuit. Unknown operations are closed.
    pub async fn state(&self, operation: &str) -> CircuitState {
        match self.existing(operation) {
            Some(circuit) => lock(&circuit).state(),
            None => CircuitState::Closed,
        }
    }

    /// Returns whether `operation`'s circuit is currently open.
    pub async fn is_open(&self, operation: &str) -> bool {
        self.state(operation).await == CircuitState::Open
    }

    /// Returns a snapshot of `operation`'s counters, if it has been called.
    pub async fn metrics(&self, operation: &str) -> Option<CircuitMetrics> {
        let circuit = self.existing(operation)?;
        let metrics = lock(&circuit).metrics();
        Some(metrics)
    }

    /// Lists every tracked operation with its state, sorted by name.
    pub async fn states(&self) -> Vec<(String, CircuitState)> {
        let circuits: Vec<(String, Arc<Mutex<Circuit>>)> = self
            .circuits()
            .iter()
            .map(|(name, circuit)| (name.clone(), Arc::clone(circuit)))
            .collect();

        let mut states = Vec::with_capacity(circuits.len());
        for (name, circuit) in circuits {
            let state = lock(&circuit).state();
            states.push((name, state));
        }
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    /// Forces `operation`'s circuit open for one reset timeout.
    pub async fn force_open(&self, operation: &str) {
        let circuit = self.circuit(operation);
        lock(&circuit).force_open(&self.config);
    }

    /// Forces `operation`'s circuit closed.
    pub async fn force_closed(&self, operation: &str) {
        let circuit = self.circuit(operation);
        lock(&circuit).force_closed(&self.config);
    }

    /// Closes `operation`'s circuit and clears its failure history.
    pub async fn reset(&self, operation: &str) {
        if let Some(circuit) = self.existing(operation) {
            lock(&circuit).reset(&self.config);
        }
    }

    /// Resets every tracked circuit.
    pub async fn reset_all(&self) {
        let circuits: Vec<Arc<Mutex<Circuit>>> = self.circuits().values().cloned().collect();
        for circuit in circuits {
            lock(&circuit).reset(&self.config);
        }
    }

    /// Wraps a `tower::Service`, naming each request's operation with `operation`.
    pub fn layer<Req, F>(&self, operation: F) -> CircuitBreakerLayer<F>
    where
        F: Fn(&Req) -> String,
    {
        CircuitBreakerLayer::new(self.clone(), operation)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("operations", &self.circuits().len())
            .finish()
    }
}
