//! Registered fallback strategies.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Error type returned by fallback functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type FallbackFn<T> = dyn Fn() -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync;

/// A fallback registered for one operation.
///
/// Consulted only after the primary call and its retries have failed and no
/// last-known-good value was cached.
///
/// ```
/// use meetgate_degradation::FallbackConfig;
/// use std::time::Duration;
///
/// // A static value
/// let empty: FallbackConfig<Vec<String>> = FallbackConfig::value(Vec::new());
///
/// // A computed value; failure of a critical fallback is reported as severe
/// let computed = FallbackConfig::new(|| async { Ok::<_, std::io::Error>(vec!["lobby".to_string()]) })
///     .critical()
///     .cache_ttl(Duration::from_secs(600));
/// assert!(computed.is_critical());
/// ```
pub struct FallbackConfig<T> {
    fallback_fn: Arc<FallbackFn<T>>,
    is_critical: bool,
    cache_ttl: Option<Duration>,
}

impl<T: 'static> FallbackConfig<T> {
    /// A fallback computed by `f` each time it is needed.
    pub fn new<F, Fut, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let fallback_fn = move || -> BoxFuture<'static, Result<T, BoxError>> {
            let fut = f();
            Box::pin(async move { fut.await.map_err(Into::into) })
        };
        Self {
            fallback_fn: Arc::new(fallback_fn),
            is_critical: false,
            cache_ttl: None,
        }
    }

    /// A fallback that always yields a clone of `value`.
    pub fn value(value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self::new(move || {
            let value = value.clone();
            async move { Ok::<_, BoxError>(value) }
        })
    }

    /// Marks the operation as critical: a failing fallback degrades the
    /// component severely instead of leaving it unavailable.
    pub fn critical(mut self) -> Self {
        self.is_critical = true;
        self
    }

    /// TTL for last-known-good values of this operation.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Whether the operation is critical.
    pub fn is_critical(&self) -> bool {
        self.is_critical
    }

    /// The configured last-known-good TTL, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.cache_ttl
    }

    pub(crate) async fn invoke(&self) -> Result<T, BoxError> {
        (self.fallback_fn)().await
    }
}

impl<T> Clone for FallbackConfig<T> {
    fn clone(&self) -> Self {
        Self {
            fallback_fn: Arc::clone(&self.fallback_fn),
            is_critical: self.is_critical,
            cache_ttl: self.cache_ttl,
        }
    }
}

impl<T> std::fmt::Debug for FallbackConfig<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackConfig")
            .field("is_critical", &self.is_critical)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}
