use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreaker, CircuitState};
use meetgate_core::EventListeners;
use std::time::Duration;

/// Configuration shared by every per-operation circuit.
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) success_threshold: u32,
    pub(crate) reset_timeout: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) initial_request_timeout: Duration,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Consecutive failures that open a closed circuit.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Half-open successes that close the circuit.
    pub fn success_threshold(&self) -> u32 {
        self.success_threshold
    }

    /// How long an open circuit waits before admitting trial calls.
    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    /// Timeout for steady-state calls.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Timeout for the first call of an operation.
    pub fn initial_request_timeout(&self) -> Duration {
        self.initial_request_timeout
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfigBuilder::new().into_config()
    }
}

/// Builder for configuring and constructing a [`CircuitBreaker`].
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: u32,
    success_threshold: u32,
    reset_timeout: Duration,
    request_timeout: Duration,
    initial_request_timeout: Duration,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            initial_request_timeout: Duration::from_secs(30),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how many consecutive failures open a closed circuit.
    ///
    /// Values below 1 are treated as 1.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = n.max(1);
        self
    }

    /// Sets how many successful trial calls close a half-open circuit.
    ///
    /// This is also the number of trial calls admitted while half-open.
    /// Values below 1 are treated as 1.
    ///
    /// Default: 2
    pub fn success_threshold(mut self, n: u32) -> Self {
        self.success_threshold = n.max(1);
        self
    }

    /// Sets how long the circuit stays open after the last failure.
    ///
    /// Default: 30 seconds
    pub fn reset_timeout(mut self, duration: Duration) -> Self {
        self.reset_timeout = duration;
        self
    }

    /// Sets the per-call timeout for steady-state calls.
    ///
    /// Default: 10 seconds
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = duration;
        self
    }

    /// Sets the timeout for the first call of each operation, which may pay
    /// connection setup costs.
    ///
    /// Default: 30 seconds
    pub fn initial_request_timeout(mut self, duration: Duration) -> Self {
        self.initial_request_timeout = duration;
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback invoked with `(operation, from, to)` on every
    /// state transition.
    ///
    /// # Example
    /// ```rust
    /// use meetgate_circuitbreaker::{CircuitBreaker, CircuitState};
    ///
    /// let breaker = CircuitBreaker::builder()
    ///     .on_state_transition(|operation, from, to| {
    ///         if to == CircuitState::Open {
    ///             println!("WARNING: {operation} circuit opened (was {from:?})");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateTransition {
                operation,
                from_state,
                to_state,
                ..
            } = event
            {
                f(operation, *from_state, *to_state);
            }
        });
        self
    }

    /// Registers a callback invoked with the operation name when a call is
    /// rejected by an open circuit.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::CallRejected { operation, .. } = event {
                f(operation);
            }
        });
        self
    }

    /// Registers a callback invoked when a call completes without a breaker failure.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::SuccessRecorded {
                operation, state, ..
            } = event
            {
                f(operation, *state);
            }
        });
        self
    }

    /// Registers a callback invoked when a breaker failure is recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::FailureRecorded {
                operation, state, ..
            } = event
            {
                f(operation, *state);
            }
        });
        self
    }

    /// Registers a callback invoked with the applied timeout when a call times out.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::Timeout {
                operation, after, ..
            } = event
            {
                f(operation, *after);
            }
        });
        self
    }

    /// Registers a callback for every event about `operation` only.
    pub fn on_event_for<F>(mut self, operation: impl Into<String>, f: F) -> Self
    where
        F: Fn(&CircuitBreakerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add_for(operation, f);
        self
    }

    /// Like [`on_state_transition`](Self::on_state_transition), but only for
    /// `operation`'s circuit.
    ///
    /// ```rust
    /// use meetgate_circuitbreaker::{CircuitBreaker, CircuitState};
    ///
    /// let breaker = CircuitBreaker::builder()
    ///     .on_state_transition_for("create_room", |_, to| {
    ///         if to == CircuitState::Open {
    ///             println!("room creation is failing fast");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition_for<F>(mut self, operation: impl Into<String>, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add_for(operation, move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            });
        self
    }

    pub(crate) fn into_config(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            reset_timeout: self.reset_timeout,
            request_timeout: self.request_timeout,
            initial_request_timeout: self.initial_request_timeout,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the circuit breaker.
    pub fn build(self) -> CircuitBreaker {
        CircuitBreaker::new(self.into_config())
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
