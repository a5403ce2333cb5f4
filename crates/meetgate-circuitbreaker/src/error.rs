use meetgate_core::{Classify, ErrorKind};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by a call guarded by the circuit breaker.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit for this operation is open; the call never reached upstream.
    #[error("circuit for `{operation}` is open; call not permitted")]
    OpenCircuit {
        /// Operation whose circuit rejected the call.
        operation: String,
    },

    /// The call did not finish within its timeout and was cancelled.
    #[error("`{operation}` timed out after {after:?}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
        /// The timeout that applied to this call.
        after: Duration,
    },

    /// An error returned by the wrapped call.
    #[error("{0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if the error indicates the circuit is open.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit { .. })
    }

    /// Returns true if the call timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitBreakerError::Timeout { .. })
    }

    /// Returns the inner error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: Classify> Classify for CircuitBreakerError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            CircuitBreakerError::OpenCircuit { .. } => ErrorKind::CircuitOpen,
            CircuitBreakerError::Timeout { .. } => ErrorKind::TransientUpstream,
            CircuitBreakerError::Inner(e) => e.kind(),
        }
    }
}

impl<E> From<E> for CircuitBreakerError<E> {
    fn from(err: E) -> Self {
        CircuitBreakerError::Inner(err)
    }
}
