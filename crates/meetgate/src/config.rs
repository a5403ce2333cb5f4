//! Gateway configuration.
//!
//! Every knob has a default; [`GatewayConfig::from_env`] overrides them from
//! `MEETGATE_*` environment variables. The API key is the only required
//! value.

use meetgate_cache::ResponseCache;
use meetgate_circuitbreaker::CircuitBreaker;
use meetgate_degradation::{DegradationCoordinator, FALLBACK_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default upstream base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/v1";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether reads are cached.
    pub enabled: bool,
    /// Default TTL in milliseconds.
    pub ttl_ms: u64,
    /// Maximum number of cached responses.
    pub max_items: usize,
    /// How long last-known-good values stay available for degraded reads,
    /// in milliseconds.
    pub stale_ttl_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: 300_000,
            max_items: 1000,
            stale_ttl_ms: 3_600_000,
        }
    }
}

impl CacheSettings {
    /// Default TTL.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Lifetime of last-known-good values.
    pub fn stale_ttl(&self) -> Duration {
        Duration::from_millis(self.stale_ttl_ms)
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Whether calls go through a breaker.
    pub enabled: bool,
    /// Consecutive failures that open a circuit.
    pub failure_threshold: u32,
    /// Half-open successes that close it again.
    pub success_threshold: u32,
    /// Time an open circuit waits before admitting a trial call, in milliseconds.
    pub reset_timeout_ms: u64,
    /// Per-call timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Timeout of an operation's first call, in milliseconds.
    pub initial_request_timeout_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout_ms: 30_000,
            request_timeout_ms: 10_000,
            initial_request_timeout_ms: 30_000,
        }
    }
}

impl CircuitBreakerSettings {
    /// Reset timeout.
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    /// Steady-state call timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// First-call timeout.
    pub fn initial_request_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_request_timeout_ms)
    }
}

/// Retry and fallback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationSettings {
    /// Whether retries and fallbacks are used.
    pub enabled: bool,
    /// Retries after the first failed attempt.
    pub max_retry_attempts: u32,
    /// First retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Delay multiplier per retry.
    pub retry_backoff_factor: f64,
    /// Upper bound on any retry delay, in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for DegradationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retry_attempts: 3,
            initial_retry_delay_ms: 1000,
            retry_backoff_factor: 2.0,
            max_retry_delay_ms: 10_000,
        }
    }
}

/// Everything needed to build a [`ResilientClient`](crate::ResilientClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Upstream API key.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Upstream base URL.
    pub api_url: String,
    /// Response cache.
    pub cache: CacheSettings,
    /// Circuit breaker.
    pub circuit_breaker: CircuitBreakerSettings,
    /// Retry and fallback.
    pub degradation: DegradationSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            cache: CacheSettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            degradation: DegradationSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `MEETGATE_API_KEY`: upstream API key (required)
    /// - `MEETGATE_API_URL`: upstream base URL
    /// - `MEETGATE_CACHE_ENABLED`, `MEETGATE_CACHE_TTL_MS`, `MEETGATE_CACHE_MAX_ITEMS`,
    ///   `MEETGATE_CACHE_STALE_TTL_MS`
    /// - `MEETGATE_CIRCUIT_BREAKER_ENABLED`, `MEETGATE_CB_FAILURE_THRESHOLD`,
    ///   `MEETGATE_CB_SUCCESS_THRESHOLD`, `MEETGATE_CB_RESET_TIMEOUT_MS`,
    ///   `MEETGATE_REQUEST_TIMEOUT_MS`, `MEETGATE_INITIAL_REQUEST_TIMEOUT_MS`
    /// - `MEETGATE_DEGRADATION_ENABLED`, `MEETGATE_MAX_RETRY_ATTEMPTS`,
    ///   `MEETGATE_INITIAL_RETRY_DELAY_MS`, `MEETGATE_RETRY_BACKOFF_FACTOR`,
    ///   `MEETGATE_MAX_RETRY_DELAY_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);
        let defaults = Self::default();

        let api_key = env
            .get("MEETGATE_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("MEETGATE_API_KEY".to_string()))?;

        let cache = CacheSettings {
            enabled: env.flag("MEETGATE_CACHE_ENABLED", defaults.cache.enabled)?,
            ttl_ms: env.parse("MEETGATE_CACHE_TTL_MS", defaults.cache.ttl_ms)?,
            max_items: env.parse("MEETGATE_CACHE_MAX_ITEMS", defaults.cache.max_items)?,
            stale_ttl_ms: env.parse("MEETGATE_CACHE_STALE_TTL_MS", defaults.cache.stale_ttl_ms)?,
        };

        let cb = &defaults.circuit_breaker;
        let circuit_breaker = CircuitBreakerSettings {
            enabled: env.flag("MEETGATE_CIRCUIT_BREAKER_ENABLED", cb.enabled)?,
            failure_threshold: env.parse("MEETGATE_CB_FAILURE_THRESHOLD", cb.failure_threshold)?,
            success_threshold: env.parse("MEETGATE_CB_SUCCESS_THRESHOLD", cb.success_threshold)?,
            reset_timeout_ms: env.parse("MEETGATE_CB_RESET_TIMEOUT_MS", cb.reset_timeout_ms)?,
            request_timeout_ms: env.parse("MEETGATE_REQUEST_TIMEOUT_MS", cb.request_timeout_ms)?,
            initial_request_timeout_ms: env.parse(
                "MEETGATE_INITIAL_REQUEST_TIMEOUT_MS",
                cb.initial_request_timeout_ms,
            )?,
        };

        let dg = &defaults.degradation;
        let degradation = DegradationSettings {
            enabled: env.flag("MEETGATE_DEGRADATION_ENABLED", dg.enabled)?,
            max_retry_attempts: env.parse("MEETGATE_MAX_RETRY_ATTEMPTS", dg.max_retry_attempts)?,
            initial_retry_delay_ms: env
                .parse("MEETGATE_INITIAL_RETRY_DELAY_MS", dg.initial_retry_delay_ms)?,
            retry_backoff_factor: env
                .parse("MEETGATE_RETRY_BACKOFF_FACTOR", dg.retry_backoff_factor)?,
            max_retry_delay_ms: env.parse("MEETGATE_MAX_RETRY_DELAY_MS", dg.max_retry_delay_ms)?,
        };

        let config = Self {
            api_key,
            api_url: env.get("MEETGATE_API_URL").unwrap_or(defaults.api_url),
            cache,
            circuit_breaker,
            degradation,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };
        if self.cache.max_items == 0 {
            return invalid("MEETGATE_CACHE_MAX_ITEMS", "must be at least 1");
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return invalid("MEETGATE_CB_FAILURE_THRESHOLD", "must be at least 1");
        }
        if self.circuit_breaker.success_threshold == 0 {
            return invalid("MEETGATE_CB_SUCCESS_THRESHOLD", "must be at least 1");
        }
        let factor = self.degradation.retry_backoff_factor;
        if !factor.is_finite() || factor < 1.0 {
            return invalid("MEETGATE_RETRY_BACKOFF_FACTOR", "must be a number >= 1.0");
        }
        Ok(())
    }

    /// Builds the response cache described by this configuration.
    ///
    /// Last-known-good values live in [`FALLBACK_NAMESPACE`] with the stale TTL.
    pub fn build_cache(&self) -> ResponseCache {
        ResponseCache::builder()
            .name("meetgate")
            .default_ttl(self.cache.ttl())
            .namespace_ttl(FALLBACK_NAMESPACE, self.cache.stale_ttl())
            .max_items(self.cache.max_items)
            .build()
    }

    /// Builds the circuit breaker described by this configuration.
    pub fn build_circuit_breaker(&self) -> CircuitBreaker {
        let cb = &self.circuit_breaker;
        CircuitBreaker::builder()
            .name("meetgate")
            .failure_threshold(cb.failure_threshold)
            .success_threshold(cb.success_threshold)
            .reset_timeout(cb.reset_timeout())
            .request_timeout(cb.request_timeout())
            .initial_request_timeout(cb.initial_request_timeout())
            .build()
    }

    /// Builds the degradation coordinator, keeping last-known-good values in `cache`.
    pub fn build_coordinator(&self, cache: Option<Arc<ResponseCache>>) -> DegradationCoordinator {
        let dg = &self.degradation;
        let mut builder = DegradationCoordinator::builder()
            .name("meetgate")
            .max_retry_attempts(dg.max_retry_attempts)
            .initial_retry_delay(Duration::from_millis(dg.initial_retry_delay_ms))
            .retry_backoff_factor(dg.retry_backoff_factor)
            .max_retry_delay(Duration::from_millis(dg.max_retry_delay_ms));
        if let Some(cache) = cache {
            builder = builder.cache(cache);
        }
        builder.build()
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{raw:?}: {e}"),
                }),
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{raw:?} is not a boolean"),
                }),
            },
        }
    }
}
