use crate::CircuitState;
use meetgate_core::{Component, GatewayEvent};
use std::time::{Duration, Instant};

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A circuit moved between states.
    StateTransition {
        operation: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A call was allowed through.
    CallPermitted {
        operation: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was rejected without reaching upstream.
    CallRejected {
        operation: String,
        timestamp: Instant,
    },
    /// A call completed without a breaker failure.
    SuccessRecorded {
        operation: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call failed in a way that counts against the circuit.
    FailureRecorded {
        operation: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call exceeded its timeout.
    Timeout {
        operation: String,
        timestamp: Instant,
        after: Duration,
    },
}

impl GatewayEvent for CircuitBreakerEvent {
    fn component(&self) -> Component {
        Component::CircuitBreaker
    }

    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
            CircuitBreakerEvent::Timeout { .. } => "timeout",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. }
            | CircuitBreakerEvent::Timeout { timestamp, .. } => *timestamp,
        }
    }

    fn operation(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { operation, .. }
            | CircuitBreakerEvent::CallPermitted { operation, .. }
            | CircuitBreakerEvent::CallRejected { operation, .. }
            | CircuitBreakerEvent::SuccessRecorded { operation, .. }
            | CircuitBreakerEvent::FailureRecorded { operation, .. }
            | CircuitBreakerEvent::Timeout { operation, .. } => operation,
        }
    }
}
