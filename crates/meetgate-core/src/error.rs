//! Failure classification shared by every meetgate component.
//!
//! Upstream errors are sorted into a small closed set of [`ErrorKind`]s.
//! The circuit breaker, the retry loop and the fallback logic all decide
//! what to do with a failure by matching on its kind, never by probing the
//! concrete error type.
//!
//! | Kind                | Retried | Counts against breaker | Falls back |
//! |---------------------|---------|------------------------|------------|
//! | `Authentication`    | no      | no                     | no         |
//! | `Validation`        | no      | no                     | no         |
//! | `NotFound`          | no      | no                     | no         |
//! | `TransientUpstream` | yes     | yes                    | yes        |
//! | `CircuitOpen`       | no      | no                     | yes        |
//! | `DegradedService`   | no      | no                     | no         |
//!
//! # Examples
//!
//! ```
//! use meetgate_core::{Classify, ErrorKind};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     BadInput,
//!     Upstream(u16),
//! }
//!
//! impl Classify for MyError {
//!     fn kind(&self) -> ErrorKind {
//!         match self {
//!             MyError::BadInput => ErrorKind::Validation,
//!             MyError::Upstream(status) => ErrorKind::from_status(*status),
//!         }
//!     }
//! }
//!
//! assert!(MyError::Upstream(503).kind().is_retryable());
//! assert!(!MyError::BadInput.kind().counts_as_failure());
//! ```

use std::fmt;
use std::io;

/// The failure categories the resilience layer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid credentials.
    Authentication,
    /// The caller supplied bad input.
    Validation,
    /// The upstream resource does not exist.
    NotFound,
    /// Timeouts, network errors and 5xx responses.
    TransientUpstream,
    /// A circuit breaker rejected the call without reaching upstream.
    CircuitOpen,
    /// Every resilience strategy was exhausted.
    DegradedService,
}

impl ErrorKind {
    /// Maps an HTTP status code onto a kind.
    ///
    /// 401/403 are authentication failures, 404 is not-found, every other
    /// 4xx is a validation (caller) error and everything else is transient.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorKind::Authentication,
            404 => ErrorKind::NotFound,
            400..=499 => ErrorKind::Validation,
            _ => ErrorKind::TransientUpstream,
        }
    }

    /// Whether a failure of this kind counts toward opening a circuit.
    pub fn counts_as_failure(self) -> bool {
        matches!(self, ErrorKind::TransientUpstream)
    }

    /// Whether a failure of this kind is worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientUpstream)
    }

    /// Whether a failure of this kind may be answered with a fallback value.
    pub fn allows_fallback(self) -> bool {
        matches!(self, ErrorKind::TransientUpstream | ErrorKind::CircuitOpen)
    }

    /// A stable lowercase name for logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::TransientUpstream => "transient_upstream",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::DegradedService => "degraded_service",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can report their [`ErrorKind`].
pub trait Classify {
    /// Returns the failure category of this error.
    fn kind(&self) -> ErrorKind;
}

impl<T: Classify + ?Sized> Classify for &T {
    fn kind(&self) -> ErrorKind {
        (**self).kind()
    }
}

impl<T: Classify + ?Sized> Classify for Box<T> {
    fn kind(&self) -> ErrorKind {
        (**self).kind()
    }
}

impl Classify for io::Error {
    fn kind(&self) -> ErrorKind {
        match io::Error::kind(self) {
            io::ErrorKind::PermissionDenied => ErrorKind::Authentication,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => ErrorKind::Validation,
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::TransientUpstream,
        }
    }
}
