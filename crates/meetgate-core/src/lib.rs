//! Core infrastructure for meetgate.
//!
//! This crate provides functionality shared by every meetgate component:
//! - Operation-scoped events for observability
//! - Failure classification ([`ErrorKind`] and [`Classify`])
//! - Wall-clock helpers for health records

pub mod error;
pub mod events;

pub use error::{Classify, ErrorKind};
pub use events::{Component, EventListener, EventListeners, GatewayEvent, Scope};

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, saturating at zero for clocks set before 1970.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
