use crate::{CircuitBreaker, CircuitBreakerError};
use futures::future::BoxFuture;
use meetgate_core::Classify;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// A Tower Layer that routes requests through a shared [`CircuitBreaker`].
///
/// The operation name for each request comes from a user-supplied function,
/// so a single layer can guard many endpoints with independent circuits.
///
/// ```rust
/// use meetgate_circuitbreaker::CircuitBreaker;
/// use tower::{ServiceBuilder, service_fn};
///
/// let breaker = CircuitBreaker::builder().failure_threshold(3).build();
///
/// let service = ServiceBuilder::new()
///     .layer(breaker.layer(|req: &(String, u32)| req.0.clone()))
///     .service(service_fn(|req: (String, u32)| async move {
///         Ok::<_, std::io::Error>(req.1)
///     }));
/// ```
pub struct CircuitBreakerLayer<F> {
    breaker: CircuitBreaker,
    operation: Arc<F>,
}

impl<F> CircuitBreakerLayer<F> {
    /// Creates a layer over `breaker` that names operations with `operation`.
    pub fn new(breaker: CircuitBreaker, operation: F) -> Self {
        Self {
            breaker,
            operation: Arc::new(operation),
        }
    }
}

impl<F> Clone for CircuitBreakerLayer<F> {
    fn clone(&self) -> Self {
        Self {
            breaker: self.breaker.clone(),
            operation: Arc::clone(&self.operation),
        }
    }
}

impl<S, F> Layer<S> for CircuitBreakerLayer<F> {
    type Service = CircuitBreakerService<S, F>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreakerService {
            inner: service,
            breaker: self.breaker.clone(),
            operation: Arc::clone(&self.operation),
        }
    }
}

/// A Tower [`Service`] guarded by per-operation circuits.
pub struct CircuitBreakerService<S, F> {
    inner: S,
    breaker: CircuitBreaker,
    operation: Arc<F>,
}

impl<S, F> CircuitBreakerService<S, F> {
    /// The breaker guarding this service.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<S: Clone, F> Clone for CircuitBreakerService<S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            breaker: self.breaker.clone(),
            operation: Arc::clone(&self.operation),
        }
    }
}

impl<S, F, Req> Service<Req> for CircuitBreakerService<S, F>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Classify + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
    F: Fn(&Req) -> String,
{
    type Response = S::Response;
    type Error = CircuitBreakerError<S::Error>;
    type Future = BoxFuture<'static, Result<S::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let operation = (self.operation)(&req);
        let breaker = self.breaker.clone();
        // the ready service handles this request; the clone takes its place
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move { breaker.call(&operation, move || inner.call(req)).await })
    }
}
