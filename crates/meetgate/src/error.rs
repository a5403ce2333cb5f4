//! Error types for upstream calls and the resilient client.

use meetgate_circuitbreaker::CircuitBreakerError;
use meetgate_core::{Classify, ErrorKind};
use meetgate_degradation::{DegradationError, HealthStatus, Strategy};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the upstream API client.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The API key was rejected (401/403).
    #[error("authentication failed: {message}")]
    Authentication {
        /// Message from the API.
        message: String,
    },

    /// Upstream answered with an unexpected status.
    #[error("API error ({status_code}): {message}")]
    Response {
        /// HTTP status code.
        status_code: u16,
        /// Error message from the API.
        message: String,
        /// Error body, when it was JSON.
        data: Option<Value>,
    },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),

    /// The resource does not exist (404).
    #[error("{resource_type} not found: {resource_id}")]
    NotFound {
        /// `room`, `recording`, ...
        resource_type: String,
        /// Name or id that was looked up.
        resource_id: String,
    },

    /// The request was rejected as invalid (400/422).
    #[error("validation failed: {}", .validation_errors.join("; "))]
    Validation {
        /// One message per problem.
        validation_errors: Vec<String>,
    },

    /// The request timed out.
    #[error("request timed out")]
    Timeout,
}

impl ApiError {
    /// A `NotFound` error.
    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    /// The HTTP status behind this error, if upstream answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Authentication { .. } => Some(401),
            ApiError::Response { status_code, .. } => Some(*status_code),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Validation { .. } => Some(400),
            ApiError::Request(_) | ApiError::Timeout => None,
        }
    }
}

impl Classify for ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Authentication { .. } => ErrorKind::Authentication,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Response { status_code, .. } => ErrorKind::from_status(*status_code),
            ApiError::Request(_) | ApiError::Timeout => ErrorKind::TransientUpstream,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Request(err.to_string())
        }
    }
}

/// Errors returned by [`ResilientClient`](crate::ResilientClient).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Upstream failed and the failure was passed through unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The circuit for `operation` is open and no degraded value was available.
    #[error("circuit open for `{operation}`")]
    CircuitOpen {
        /// Operation whose circuit is open.
        operation: String,
    },

    /// The breaker gave up waiting for upstream.
    #[error("`{operation}` timed out after {after:?}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
        /// The timeout that elapsed.
        after: Duration,
    },

    /// Every resilience strategy failed.
    #[error("`{operation}` is unavailable after trying [{}]: {last_error}", strategies(.attempted_strategies))]
    Degraded {
        /// Operation that failed.
        operation: String,
        /// Strategies tried, in order.
        attempted_strategies: Vec<Strategy>,
        /// Component health after the failure.
        status: HealthStatus,
        /// The last upstream failure.
        #[source]
        last_error: Box<GatewayError>,
    },
}

fn strategies(list: &[Strategy]) -> String {
    list.iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl GatewayError {
    /// The upstream error, if this is a pass-through failure.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            GatewayError::Api(e) => Some(e),
            GatewayError::Degraded { last_error, .. } => last_error.api_error(),
            _ => None,
        }
    }

    /// Returns true if every strategy was exhausted.
    pub fn is_degraded(&self) -> bool {
        matches!(self, GatewayError::Degraded { .. })
    }
}

impl Classify for GatewayError {
    fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Api(e) => e.kind(),
            GatewayError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            GatewayError::Timeout { .. } => ErrorKind::TransientUpstream,
            GatewayError::Degraded { .. } => ErrorKind::DegradedService,
        }
    }
}

impl From<CircuitBreakerError<ApiError>> for GatewayError {
    fn from(err: CircuitBreakerError<ApiError>) -> Self {
        match err {
            CircuitBreakerError::OpenCircuit { operation } => GatewayError::CircuitOpen { operation },
            CircuitBreakerError::Timeout { operation, after } => {
                GatewayError::Timeout { operation, after }
            }
            CircuitBreakerError::Inner(e) => GatewayError::Api(e),
        }
    }
}

impl From<DegradationError<CircuitBreakerError<ApiError>>> for GatewayError {
    fn from(err: DegradationError<CircuitBreakerError<ApiError>>) -> Self {
        match err {
            DegradationError::Inner(e) => e.into(),
            DegradationError::Degraded {
                operation,
                attempted_strategies,
                status,
                last_error,
            } => GatewayError::Degraded {
                operation,
                attempted_strategies,
                status,
                last_error: Box::new(last_error.into()),
            },
        }
    }
}
