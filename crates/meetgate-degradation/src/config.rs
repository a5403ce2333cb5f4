use crate::events::DegradationEvent;
use crate::{Backoff, DegradationCoordinator, HealthStatus, Strategy};
use meetgate_cache::ResponseCache;
use meetgate_core::EventListeners;
use std::sync::Arc;
use std::time::Duration;

/// Namespace used for last-known-good values in the shared cache.
pub const FALLBACK_NAMESPACE: &str = "fallback";

/// Configuration for the degradation coordinator.
pub struct DegradationConfig {
    pub(crate) max_retry_attempts: u32,
    pub(crate) backoff: Backoff,
    pub(crate) cache_namespace: String,
    pub(crate) event_listeners: EventListeners<DegradationEvent>,
    pub(crate) name: String,
}

impl DegradationConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> DegradationConfigBuilder {
        DegradationConfigBuilder::new()
    }

    /// Retries after the first failed attempt.
    pub fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    /// The retry delay schedule.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }
}

impl Default for DegradationConfig {
    fn default() -> Self {
        DegradationConfigBuilder::new().into_parts().0
    }
}

/// Builder for configuring and constructing a [`DegradationCoordinator`].
pub struct DegradationConfigBuilder {
    max_retry_attempts: u32,
    initial_retry_delay: Duration,
    retry_backoff_factor: f64,
    max_retry_delay: Duration,
    cache: Option<Arc<ResponseCache>>,
    cache_namespace: String,
    event_listeners: EventListeners<DegradationEvent>,
    name: String,
}

impl DegradationConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_retry_attempts: 3,
            initial_retry_delay: Duration::from_secs(1),
            retry_backoff_factor: 2.0,
            max_retry_delay: Duration::from_secs(10),
            cache: None,
            cache_namespace: FALLBACK_NAMESPACE.to_string(),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how many times a transient failure is retried.
    ///
    /// Default: 3
    pub fn max_retry_attempts(mut self, n: u32) -> Self {
        self.max_retry_attempts = n;
        self
    }

    /// Sets the delay before the first retry.
    ///
    /// Default: 1 second
    pub fn initial_retry_delay(mut self, delay: Duration) -> Self {
        self.initial_retry_delay = delay;
        self
    }

    /// Sets the multiplier applied to the delay after each retry.
    ///
    /// Default: 2.0
    pub fn retry_backoff_factor(mut self, factor: f64) -> Self {
        self.retry_backoff_factor = factor;
        self
    }

    /// Sets the upper bound on any single retry delay.
    ///
    /// Default: 10 seconds
    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = delay;
        self
    }

    /// Keeps last-known-good values in `cache` and serves them when upstream
    /// is down. Without a cache the stale-value strategy is skipped.
    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the cache namespace for last-known-good values.
    ///
    /// Default: `"fallback"`
    pub fn cache_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cache_namespace = namespace.into();
        self
    }

    /// Give this coordinator a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked with `(operation, attempt, delay)` before each retry.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &DegradationEvent| {
            if let DegradationEvent::Retry {
                operation,
                attempt,
                delay,
                ..
            } = event
            {
                f(operation, *attempt, *delay);
            }
        });
        self
    }

    /// Registers a callback invoked when a degraded value is served.
    pub fn on_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Strategy) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &DegradationEvent| {
            if let DegradationEvent::FallbackUsed {
                operation,
                strategy,
                ..
            } = event
            {
                f(operation, *strategy);
            }
        });
        self
    }

    /// Registers a callback invoked when a component changes health status.
    pub fn on_health_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, HealthStatus, HealthStatus) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &DegradationEvent| {
            if let DegradationEvent::HealthChanged {
                operation,
                from,
                to,
                ..
            } = event
            {
                f(operation, *from, *to);
            }
        });
        self
    }

    /// Registers a callback for every event about `operation` only.
    pub fn on_event_for<F>(mut self, operation: impl Into<String>, f: F) -> Self
    where
        F: Fn(&DegradationEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add_for(operation, f);
        self
    }

    /// Like [`on_health_change`](Self::on_health_change), but only for
    /// `operation`.
    pub fn on_health_change_for<F>(mut self, operation: impl Into<String>, f: F) -> Self
    where
        F: Fn(HealthStatus, HealthStatus) + Send + Sync + 'static,
    {
        self.event_listeners
            .add_for(operation, move |event: &DegradationEvent| {
                if let DegradationEvent::HealthChanged { from, to, .. } = event {
                    f(*from, *to);
                }
            });
        self
    }

    fn into_parts(self) -> (DegradationConfig, Option<Arc<ResponseCache>>) {
        let config = DegradationConfig {
            max_retry_attempts: self.max_retry_attempts,
            backoff: Backoff::new(
                self.initial_retry_delay,
                self.retry_backoff_factor,
                self.max_retry_delay,
            ),
            cache_namespace: self.cache_namespace,
            event_listeners: self.event_listeners,
            name: self.name,
        };
        (config, self.cache)
    }

    /// Builds the coordinator.
    pub fn build(self) -> DegradationCoordinator {
        let (config, cache) = self.into_parts();
        DegradationCoordinator::new(config, cache)
    }
}

impl Default for DegradationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
