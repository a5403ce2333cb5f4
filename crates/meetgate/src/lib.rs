//! Resilient access to a video-conferencing REST API.
//!
//! `meetgate` puts three resilience components between callers and the
//! upstream rooms / meeting-tokens / recordings API:
//!
//! - **Cache** ([`cache`]): namespaced TTL cache for read responses, invalidated by writes
//! - **Circuit breaker** ([`circuitbreaker`]): per-operation state machines that fail fast
//!   while upstream is down
//! - **Degradation** ([`degradation`]): retry with backoff, last-known-good values,
//!   registered fallbacks and component health
//!
//! [`ResilientClient`] composes them around any [`RoomsApi`], usually the
//! [`HttpRoomsClient`]. Every operation returns a [`Degraded`] envelope whose
//! `is_degraded` flag tells the caller whether the value is fresh.
//!
//! # Example
//!
//! ```rust,no_run
//! use meetgate::{GatewayConfig, ListParams, ResilientClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env()?;
//! let client = ResilientClient::connect(&config)?;
//!
//! let room = client.get_room("standup").await?;
//! println!("{} (degraded: {})", room.data.url, room.is_degraded);
//!
//! let recordings = client
//!     .list_recordings(&ListParams::default().room_name("standup"))
//!     .await?;
//! println!("{} recordings", recordings.data.total_count);
//!
//! // Surface as an HTTP health endpoint
//! let health = client.health();
//! println!("{} {}", health.http_status(), serde_json::to_string(&health)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Failure handling
//!
//! | Upstream failure          | Retried | Breaker failure | Degraded value |
//! |---------------------------|---------|-----------------|----------------|
//! | 401 / 403                 | no      | no              | no             |
//! | 400 / 404 / 422           | no      | no              | no             |
//! | 5xx, timeout, network     | yes     | yes             | yes            |
//! | circuit open              | no      | n/a             | yes            |

pub use meetgate_cache as cache;
pub use meetgate_circuitbreaker as circuitbreaker;
pub use meetgate_core as core;
pub use meetgate_degradation as degradation;

mod api;
mod client;
mod config;
mod error;
mod http;
mod models;

pub use api::RoomsApi;
pub use client::{
    ResilientClient, ResilientClientBuilder, RECORDINGS_NAMESPACE, RECORDING_LISTS_NAMESPACE,
    ROOMS_NAMESPACE, ROOM_LISTS_NAMESPACE,
};
pub use config::{
    CacheSettings, CircuitBreakerSettings, ConfigError, DegradationSettings, GatewayConfig,
    DEFAULT_API_URL,
};
pub use error::{ApiError, GatewayError};
pub use http::{HttpRoomsClient, DEFAULT_HTTP_TIMEOUT};
pub use meetgate_core::{Classify, ErrorKind};
pub use meetgate_degradation::{Degraded, HealthReport, HealthStatus};
pub use models::{
    CreateRoom, Deleted, ListParams, MeetingToken, MeetingTokenRequest, Page, Recording,
    RecordingList, Room, RoomList, TokenValidation, UpdateRoom,
};
