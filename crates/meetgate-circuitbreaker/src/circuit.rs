use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of one operation's circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed,
    /// The circuit is open and calls are rejected.
    Open,
    /// The circuit is half-open and a limited number of trial calls are allowed.
    HalfOpen,
}

impl CircuitState {
    /// A stable name for logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

/// Snapshot of one circuit's counters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state of the circuit.
    pub state: CircuitState,
    /// Consecutive breaker failures while closed.
    pub failure_count: u32,
    /// Successful trial calls while half-open.
    pub success_count: u32,
    /// Calls that were admitted since the circuit was created.
    pub total_calls: u64,
    /// Calls rejected without reaching upstream.
    pub rejected_calls: u64,
    /// Time since the last state transition.
    #[cfg_attr(feature = "serde", serde(with = "duration_millis"))]
    pub time_since_state_change: Duration,
    /// Time since the last recorded breaker failure, if any.
    #[cfg_attr(feature = "serde", serde(with = "option_duration_millis"))]
    pub time_since_last_failure: Option<Duration>,
}

#[cfg(feature = "serde")]
mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(feature = "serde")]
mod option_duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }
}

pub(crate) struct Circuit {
    operation: String,
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_permits: u32,
    // Bumped on every transition so late permit releases can be told apart.
    epoch: u64,
    last_failure_time: Option<Instant>,
    last_state_change: Instant,
    total_calls: u64,
    rejected_calls: u64,
}

impl Circuit {
    pub(crate) fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            half_open_permits: 0,
            epoch: 0,
            last_failure_time: None,
            last_state_change: Instant::now(),
            total_calls: 0,
            rejected_calls: 0,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            total_calls: self.total_calls,
            rejected_calls: self.rejected_calls,
            time_since_state_change: self.last_state_change.elapsed(),
            time_since_last_failure: self.last_failure_time.map(|t| t.elapsed()),
        }
    }

    /// Decides whether a call may proceed, moving an open circuit to
    /// half-open once the reset timeout has elapsed.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> bool {
        if self.state == CircuitState::Open {
            let cooled_down = self
                .last_failure_time
                .map_or(true, |t| t.elapsed() >= config.reset_timeout);
            if cooled_down {
                self.transition_to(CircuitState::HalfOpen, config);
            }
        }

        let permitted = match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if self.half_open_permits < config.success_threshold {
                    self.half_open_permits += 1;
                    true
                } else {
                    false
                }
            }
        };

        if permitted {
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallPermitted {
                    operation: self.operation.clone(),
                    timestamp: std::time::Instant::now(),
                    state: self.state,
                });
        } else {
            self.rejected_calls += 1;
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallRejected {
                    operation: self.operation.clone(),
                    timestamp: std::time::Instant::now(),
                });

            #[cfg(feature = "metrics")]
            counter!("meetgate_circuitbreaker_calls_total", "breaker" => config.name.clone(), "operation" => self.operation.clone(), "outcome" => "rejected").increment(1);
        }

        permitted
    }

    /// Registers an admitted call and returns the timeout that applies to it.
    pub(crate) fn begin_call(&mut self, config: &CircuitBreakerConfig) -> Duration {
        let first = self.total_calls == 0;
        self.total_calls += 1;
        if first {
            config.initial_request_timeout
        } else {
            config.request_timeout
        }
    }

    pub(crate) fn record_success(&mut self, config: &CircuitBreakerConfig, duration: Duration) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                operation: self.operation.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        {
            counter!("meetgate_circuitbreaker_calls_total", "breaker" => config.name.clone(), "operation" => self.operation.clone(), "outcome" => "success").increment(1);
            histogram!("meetgate_circuitbreaker_call_duration_seconds", "breaker" => config.name.clone(), "operation" => self.operation.clone())
                .record(duration.as_secs_f64());
        }
        #[cfg(not(feature = "metrics"))]
        let _ = duration;

        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= config.success_threshold {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            // A call admitted before the circuit opened; the open period stands.
            CircuitState::Open => {}
        }
    }

    pub(crate) fn record_failure(&mut self, config: &CircuitBreakerConfig, duration: Duration) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                operation: self.operation.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        {
            counter!("meetgate_circuitbreaker_calls_total", "breaker" => config.name.clone(), "operation" => self.operation.clone(), "outcome" => "failure").increment(1);
            histogram!("meetgate_circuitbreaker_call_duration_seconds", "breaker" => config.name.clone(), "operation" => self.operation.clone())
                .record(duration.as_secs_f64());
        }
        #[cfg(not(feature = "metrics"))]
        let _ = duration;

        self.last_failure_time = Some(Instant::now());

        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open, config);
            }
            CircuitState::Open => {}
        }
    }

    /// Hands back the trial slot of a call that ended without an outcome.
    ///
    /// Only applies to the half-open period the call was admitted in.
    pub(crate) fn release_permit(&mut self, epoch: u64) {
        if self.epoch != epoch || self.state != CircuitState::HalfOpen {
            return;
        }
        self.half_open_permits = self.half_open_permits.saturating_sub(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            operation = %self.operation,
            permits_in_use = self.half_open_permits,
            "Trial call dropped before completing; permit released"
        );
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.last_failure_time = Some(Instant::now());
        self.transition_to(CircuitState::Open, config);
    }

    pub(crate) fn force_closed(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    /// Back to a freshly created closed circuit, keeping call totals.
    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.failure_count = 0;
        self.last_failure_time = None;
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                operation: self.operation.clone(),
                timestamp: std::time::Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        {
            if state == CircuitState::Open {
                tracing::warn!(
                    breaker = %config.name,
                    operation = %self.operation,
                    from = from_state.as_str(),
                    "Circuit opened"
                );
            } else {
                tracing::info!(
                    breaker = %config.name,
                    operation = %self.operation,
                    from = from_state.as_str(),
                    to = state.as_str(),
                    "Circuit state transition"
                );
            }
        }

        #[cfg(feature = "metrics")]
        {
            counter!(
                "meetgate_circuitbreaker_transitions_total",
                "breaker" => config.name.clone(),
                "operation" => self.operation.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            let level = match state {
                CircuitState::Closed => 0.0,
                CircuitState::HalfOpen => 1.0,
                CircuitState::Open => 2.0,
            };
            gauge!("meetgate_circuitbreaker_state", "breaker" => config.name.clone(), "operation" => self.operation.clone())
                .set(level);
        }

        self.state = state;
        self.epoch += 1;
        self.last_state_change = Instant::now();
        self.success_count = 0;
        self.half_open_permits = 0;
        if state != CircuitState::Open {
            self.failure_count = 0;
        }
    }
}

pub(crate) fn lock(circuit: &Mutex<Circuit>) -> MutexGuard<'_, Circuit> {
    circuit.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An admitted call that has not reported its outcome yet.
///
/// Dropping it unsettled (the caller's future was cancelled) releases the
/// half-open permit the call was holding.
pub(crate) struct Admission {
    circuit: Arc<Mutex<Circuit>>,
    epoch: u64,
    settled: bool,
}

impl Admission {
    pub(crate) fn new(circuit: Arc<Mutex<Circuit>>, epoch: u64) -> Self {
        Self {
            circuit,
            epoch,
            settled: false,
        }
    }

    /// Marks the outcome as about to be recorded.
    pub(crate) fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if !self.settled {
            lock(&self.circuit).release_permit(self.epoch);
        }
    }
}
