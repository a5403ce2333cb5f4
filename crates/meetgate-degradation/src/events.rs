use crate::{HealthStatus, Strategy};
use meetgate_core::{Component, GatewayEvent};
use std::time::{Duration, Instant};

/// Events emitted by the degradation coordinator.
#[derive(Debug, Clone)]
pub enum DegradationEvent {
    /// A retry is about to be made after `delay`.
    Retry {
        operation: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
    },
    /// The primary call succeeded.
    Success {
        operation: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// A degraded value was served by `strategy`.
    FallbackUsed {
        operation: String,
        timestamp: Instant,
        strategy: Strategy,
    },
    /// The registered fallback itself failed.
    FallbackFailed {
        operation: String,
        timestamp: Instant,
        critical: bool,
    },
    /// Nothing could be served.
    Exhausted {
        operation: String,
        timestamp: Instant,
        attempted_strategies: Vec<Strategy>,
    },
    /// A component changed health status.
    HealthChanged {
        operation: String,
        timestamp: Instant,
        from: HealthStatus,
        to: HealthStatus,
    },
}

impl GatewayEvent for DegradationEvent {
    fn component(&self) -> Component {
        Component::Degradation
    }

    fn event_type(&self) -> &'static str {
        match self {
            DegradationEvent::Retry { .. } => "retry",
            DegradationEvent::Success { .. } => "success",
            DegradationEvent::FallbackUsed { .. } => "fallback_used",
            DegradationEvent::FallbackFailed { .. } => "fallback_failed",
            DegradationEvent::Exhausted { .. } => "exhausted",
            DegradationEvent::HealthChanged { .. } => "health_changed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            DegradationEvent::Retry { timestamp, .. }
            | DegradationEvent::Success { timestamp, .. }
            | DegradationEvent::FallbackUsed { timestamp, .. }
            | DegradationEvent::FallbackFailed { timestamp, .. }
            | DegradationEvent::Exhausted { timestamp, .. }
            | DegradationEvent::HealthChanged { timestamp, .. } => *timestamp,
        }
    }

    fn operation(&self) -> &str {
        match self {
            DegradationEvent::Retry { operation, .. }
            | DegradationEvent::Success { operation, .. }
            | DegradationEvent::FallbackUsed { operation, .. }
            | DegradationEvent::FallbackFailed { operation, .. }
            | DegradationEvent::Exhausted { operation, .. }
            | DegradationEvent::HealthChanged { operation, .. } => operation,
        }
    }
}
