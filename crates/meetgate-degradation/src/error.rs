//! Error types for the degradation coordinator.

use crate::HealthStatus;
use meetgate_core::{Classify, ErrorKind};
use std::fmt;
use thiserror::Error;

/// A resilience strategy the coordinator can fall back on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Re-invoking the primary call with backoff.
    Retry,
    /// Serving the last-known-good cached value.
    Cache,
    /// Running the registered fallback.
    Fallback,
}

impl Strategy {
    /// A stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Retry => "retry",
            Strategy::Cache => "cache",
            Strategy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join(strategies: &[Strategy]) -> String {
    strategies
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors returned by [`DegradationCoordinator::execute_with_fallback`](crate::DegradationCoordinator::execute_with_fallback).
#[derive(Debug, Error)]
pub enum DegradationError<E> {
    /// The primary call failed in a way no strategy may paper over
    /// (authentication, validation, not found). The error is unchanged.
    #[error("{0}")]
    Inner(E),

    /// Every strategy was tried and none produced a value.
    #[error("`{operation}` is unavailable after trying [{}]: {last_error}", join(.attempted_strategies))]
    Degraded {
        /// Operation that failed.
        operation: String,
        /// Strategies that were attempted, in order.
        attempted_strategies: Vec<Strategy>,
        /// Component status after the failure.
        status: HealthStatus,
        /// The last primary error.
        last_error: E,
    },
}

impl<E> DegradationError<E> {
    /// Returns true if every strategy was exhausted.
    pub fn is_degraded(&self) -> bool {
        matches!(self, DegradationError::Degraded { .. })
    }

    /// The primary error behind this failure.
    pub fn last_error(&self) -> &E {
        match self {
            DegradationError::Inner(e) => e,
            DegradationError::Degraded { last_error, .. } => last_error,
        }
    }

    /// Converts into the primary error.
    pub fn into_inner(self) -> E {
        match self {
            DegradationError::Inner(e) => e,
            DegradationError::Degraded { last_error, .. } => last_error,
        }
    }
}

impl<E: Classify> Classify for DegradationError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            DegradationError::Inner(e) => e.kind(),
            DegradationError::Degraded { .. } => ErrorKind::DegradedService,
        }
    }
}
