//! Graceful degradation for upstream calls.
//!
//! The [`DegradationCoordinator`] runs an operation and, when upstream is
//! failing, works down a fixed ladder of strategies:
//!
//! 1. Call upstream. A success is returned as-is and remembered as the
//!    operation's last-known-good value.
//! 2. Transient failures are retried with capped exponential backoff.
//!    Authentication, validation and not-found errors are returned
//!    immediately; an open circuit skips straight to step 3.
//! 3. Serve the last-known-good value from the shared cache.
//! 4. Run the operation's registered [`FallbackConfig`].
//! 5. Give up with [`DegradationError::Degraded`], listing what was tried.
//!
//! Values from steps 3 and 4 are always marked `is_degraded: true`. Every
//! execution updates the operation's [`DegradationRecord`]; [`health`]
//! aggregates them into a [`HealthReport`].
//!
//! [`health`]: DegradationCoordinator::health
//!
//! # Examples
//!
//! ```
//! use meetgate_degradation::{DegradationCoordinator, ExecuteOptions, FallbackConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let coordinator = DegradationCoordinator::builder()
//!     .max_retry_attempts(2)
//!     .initial_retry_delay(Duration::from_millis(10))
//!     .build();
//! coordinator.register_fallback("list_rooms", FallbackConfig::value(Vec::<String>::new()));
//!
//! let result = coordinator
//!     .execute_with_fallback("list_rooms", ExecuteOptions::default(), || async {
//!         Err::<Vec<String>, _>(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "down"))
//!     })
//!     .await
//!     .unwrap();
//!
//! assert!(result.is_degraded);
//! assert!(result.data.is_empty());
//! # }
//! ```

mod backoff;
mod config;
mod error;
mod events;
mod fallback;
mod health;

pub use backoff::Backoff;
pub use config::{DegradationConfig, DegradationConfigBuilder, FALLBACK_NAMESPACE};
pub use error::{DegradationError, Strategy};
pub use events::DegradationEvent;
pub use fallback::{BoxError, FallbackConfig};
pub use health::{DegradationRecord, HealthReport, HealthStatus};

use health::HealthRegistry;
use meetgate_cache::ResponseCache;
use meetgate_core::Classify;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;
#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A result that may have been served by a degraded strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degraded<T> {
    /// The value.
    pub data: T,
    /// True when `data` came from the cache or a fallback instead of upstream.
    pub is_degraded: bool,
}

impl<T> Degraded<T> {
    /// A fresh upstream value.
    pub fn fresh(data: T) -> Self {
        Self {
            data,
            is_degraded: false,
        }
    }

    /// A value served instead of upstream.
    pub fn degraded(data: T) -> Self {
        Self {
            data,
            is_degraded: true,
        }
    }

    /// Maps the value, keeping the degraded flag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Degraded<U> {
        Degraded {
            data: f(self.data),
            is_degraded: self.is_degraded,
        }
    }

    /// Discards the flag.
    pub fn into_inner(self) -> T {
        self.data
    }
}

/// Per-call options for [`DegradationCoordinator::execute_with_fallback`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Key under which the last-known-good value is stored.
    pub cache_key: Option<String>,
    /// TTL for the stored value; overrides the fallback's TTL.
    pub cache_ttl: Option<Duration>,
    /// Do not serve a stored value for this call.
    pub skip_cache: bool,
}

impl ExecuteOptions {
    /// Options that remember successful values under `key`.
    pub fn cached(key: impl Into<String>) -> Self {
        Self {
            cache_key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Sets the TTL for the stored value.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Never serve a stored value for this call.
    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }
}

type FallbackMap = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// Coordinates retry, stale-cache and fallback strategies, and tracks health.
///
/// Cloning is cheap and every clone shares fallbacks, health records and the
/// cache.
#[derive(Clone)]
pub struct DegradationCoordinator {
    config: Arc<DegradationConfig>,
    cache: Option<Arc<ResponseCache>>,
    fallbacks: Arc<RwLock<FallbackMap>>,
    health: Arc<HealthRegistry>,
}

impl DegradationCoordinator {
    /// Creates a coordinator. Without a cache, last-known-good values are not kept.
    pub fn new(config: DegradationConfig, cache: Option<Arc<ResponseCache>>) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "meetgate_degradation_retries_total",
                    "Total number of retried upstream calls"
                );
                describe_counter!(
                    "meetgate_degradation_fallbacks_total",
                    "Total number of degraded values served, by strategy"
                );
                describe_counter!(
                    "meetgate_degradation_exhausted_total",
                    "Total number of executions where every strategy failed"
                );
                describe_gauge!(
                    "meetgate_degradation_health",
                    "Component health (0 healthy, 1 partial, 2 severe, 3 unavailable)"
                );
            });
        }

        Self {
            config: Arc::new(config),
            cache,
            fallbacks: Arc::new(RwLock::new(HashMap::new())),
            health: Arc::new(HealthRegistry::default()),
        }
    }

    /// Returns a builder for a new coordinator.
    pub fn builder() -> DegradationConfigBuilder {
        DegradationConfigBuilder::new()
    }

    /// The coordinator's configuration.
    pub fn config(&self) -> &DegradationConfig {
        &self.config
    }

    /// Registers the fallback for `operation`, replacing any earlier one.
    pub fn register_fallback<T>(&self, operation: impl Into<String>, fallback: FallbackConfig<T>)
    where
        T: Send + Sync + 'static,
    {
        self.fallbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation.into(), Arc::new(fallback));
    }

    /// Whether a fallback producing `T` is registered for `operation`.
    pub fn has_fallback<T: Send + Sync + 'static>(&self, operation: &str) -> bool {
        self.fallback::<T>(operation).is_some()
    }

    fn fallback<T: Send + Sync + 'static>(&self, operation: &str) -> Option<FallbackConfig<T>> {
        let fallbacks = self.fallbacks.read().unwrap_or_else(PoisonError::into_inner);
        fallbacks
            .get(operation)
            .and_then(|f| f.downcast_ref::<FallbackConfig<T>>())
            .cloned()
    }

    /// Runs `primary` for `operation`, degrading gracefully when it fails.
    ///
    /// `primary` is invoked once, then again for each retry of a transient
    /// failure. Errors that no strategy may hide are returned as
    /// [`DegradationError::Inner`].
    pub async fn execute_with_fallback<T, E, F, Fut>(
        &self,
        operation: &str,
        options: ExecuteOptions,
        mut primary: F,
    ) -> Result<Degraded<T>, DegradationError<E>>
    where
        T: Clone + Send + Sync + 'static,
        E: Classify + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let fallback = self.fallback::<T>(operation);
        let backoff = self.config.backoff;
        let mut attempt: u32 = 0;

        let last_error = loop {
            match primary().await {
                Ok(value) => {
                    self.remember(operation, &options, fallback.as_ref(), &value);
                    self.set_status(operation, HealthStatus::Healthy, None);
                    self.config.event_listeners.emit(&DegradationEvent::Success {
                        operation: operation.to_string(),
                        timestamp: Instant::now(),
                        attempts: attempt + 1,
                    });
                    return Ok(Degraded::fresh(value));
                }
                Err(err) => {
                    let kind = err.kind();
                    if !kind.allows_fallback() {
                        #[cfg(feature = "tracing")]
                        debug!(operation, kind = %kind, "Error is not degradable; returning it");
                        return Err(DegradationError::Inner(err));
                    }

                    self.health.record_error(operation, err.to_string());

                    if !kind.is_retryable() || attempt >= self.config.max_retry_attempts {
                        break err;
                    }

                    let delay = backoff.delay(attempt);
                    attempt += 1;

                    #[cfg(feature = "tracing")]
                    debug!(operation, attempt, delay_ms = delay.as_millis() as u64, error = %err, "Retrying");

                    #[cfg(feature = "metrics")]
                    counter!("meetgate_degradation_retries_total", "coordinator" => self.config.name.clone(), "operation" => operation.to_string())
                        .increment(1);

                    self.config.event_listeners.emit(&DegradationEvent::Retry {
                        operation: operation.to_string(),
                        timestamp: Instant::now(),
                        attempt,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        };

        let mut attempted = Vec::with_capacity(3);
        if attempt > 0 {
            attempted.push(Strategy::Retry);
        }

        if let (Some(key), false) = (&options.cache_key, options.skip_cache) {
            if let Some(cache) = &self.cache {
                attempted.push(Strategy::Cache);
                if let Some(stale) = cache.get::<T>(&self.config.cache_namespace, key) {
                    self.degraded(operation, Strategy::Cache, &last_error);
                    return Ok(Degraded::degraded(stale));
                }
            }
        }

        let mut status = HealthStatus::Unavailable;
        if let Some(fallback) = fallback {
            attempted.push(Strategy::Fallback);
            match fallback.invoke().await {
                Ok(value) => {
                    self.degraded(operation, Strategy::Fallback, &last_error);
                    return Ok(Degraded::degraded(value));
                }
                Err(_fallback_err) => {
                    #[cfg(feature = "tracing")]
                    warn!(operation, error = %_fallback_err, critical = fallback.is_critical(), "Fallback failed");

                    self.config
                        .event_listeners
                        .emit(&DegradationEvent::FallbackFailed {
                            operation: operation.to_string(),
                            timestamp: Instant::now(),
                            critical: fallback.is_critical(),
                        });
                    if fallback.is_critical() {
                        status = HealthStatus::SeverelyDegraded;
                    }
                }
            }
        }

        self.set_status(operation, status, Some(last_error.to_string()));

        #[cfg(feature = "tracing")]
        warn!(operation, status = %status, error = %last_error, "Every strategy failed");

        #[cfg(feature = "metrics")]
        counter!("meetgate_degradation_exhausted_total", "coordinator" => self.config.name.clone(), "operation" => operation.to_string())
            .increment(1);

        self.config.event_listeners.emit(&DegradationEvent::Exhausted {
            operation: operation.to_string(),
            timestamp: Instant::now(),
            attempted_strategies: attempted.clone(),
        });

        Err(DegradationError::Degraded {
            operation: operation.to_string(),
            attempted_strategies: attempted,
            status,
            last_error,
        })
    }

    fn remember<T>(
        &self,
        operation: &str,
        options: &ExecuteOptions,
        fallback: Option<&FallbackConfig<T>>,
        value: &T,
    ) where
        T: Clone + Send + Sync + 'static,
    {
        let (Some(cache), Some(key)) = (&self.cache, &options.cache_key) else {
            return;
        };
        let ttl = options
            .cache_ttl
            .or_else(|| fallback.and_then(FallbackConfig::ttl));
        cache.set(&self.config.cache_namespace, key, value.clone(), ttl);

        #[cfg(feature = "tracing")]
        tracing::trace!(operation, key = %key, "Stored last-known-good value");
        #[cfg(not(feature = "tracing"))]
        let _ = operation;
    }

    fn degraded(&self, operation: &str, strategy: Strategy, cause: &impl Display) {
        let message = match strategy {
            Strategy::Cache => format!("serving cached data: {cause}"),
            _ => format!("serving fallback data: {cause}"),
        };

        #[cfg(feature = "tracing")]
        info!(operation, strategy = %strategy, "{message}");

        #[cfg(feature = "metrics")]
        counter!("meetgate_degradation_fallbacks_total", "coordinator" => self.config.name.clone(), "operation" => operation.to_string(), "strategy" => strategy.as_str())
            .increment(1);

        self.set_status(operation, HealthStatus::PartiallyDegraded, Some(message));
        self.config
            .event_listeners
            .emit(&DegradationEvent::FallbackUsed {
                operation: operation.to_string(),
                timestamp: Instant::now(),
                strategy,
            });
    }

    fn set_status(&self, operation: &str, status: HealthStatus, message: Option<String>) {
        let previous = self.health.set_status(operation, status, message);

        #[cfg(feature = "metrics")]
        gauge!("meetgate_degradation_health", "coordinator" => self.config.name.clone(), "operation" => operation.to_string())
            .set(match status {
                HealthStatus::Healthy => 0.0,
                HealthStatus::PartiallyDegraded => 1.0,
                HealthStatus::SeverelyDegraded => 2.0,
                HealthStatus::Unavailable => 3.0,
            });

        if previous != status {
            #[cfg(feature = "tracing")]
            info!(operation, from = %previous, to = %status, "Component health changed");

            self.config
                .event_listeners
                .emit(&DegradationEvent::HealthChanged {
                    operation: operation.to_string(),
                    timestamp: Instant::now(),
                    from: previous,
                    to: status,
                });
        }
    }

    /// Health of every component seen so far.
    pub fn health(&self) -> HealthReport {
        self.health.report()
    }

    /// Health record of one component.
    pub fn component_health(&self, name: &str) -> Option<DegradationRecord> {
        self.health.get(name)
    }

    /// Forgets every health record.
    pub fn reset_health(&self) {
        self.health.clear();
    }
}

impl Default for DegradationCoordinator {
    fn default() -> Self {
        Self::new(DegradationConfig::default(), None)
    }
}

impl std::fmt::Debug for DegradationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationCoordinator")
            .field("name", &self.config.name)
            .field("max_retry_attempts", &self.config.max_retry_attempts)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}
