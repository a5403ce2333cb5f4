//! The resilient client facade.

use crate::api::RoomsApi;
use crate::config::GatewayConfig;
use crate::error::{ApiError, GatewayError};
use crate::http::HttpRoomsClient;
use crate::models::{
    CreateRoom, Deleted, ListParams, MeetingToken, MeetingTokenRequest, Recording, RecordingList,
    Room, RoomList, TokenValidation, UpdateRoom,
};
use meetgate_cache::ResponseCache;
use meetgate_circuitbreaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
use meetgate_degradation::{
    Degraded, DegradationCoordinator, ExecuteOptions, FallbackConfig, HealthReport, HealthStatus,
    FALLBACK_NAMESPACE,
};
use std::future::Future;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Cache namespace of single rooms, keyed by name.
pub const ROOMS_NAMESPACE: &str = "rooms";
/// Cache namespace of room pages, keyed by [`ListParams::cache_key`].
pub const ROOM_LISTS_NAMESPACE: &str = "room_lists";
/// Cache namespace of single recordings, keyed by id.
pub const RECORDINGS_NAMESPACE: &str = "recordings";
/// Cache namespace of recording pages.
pub const RECORDING_LISTS_NAMESPACE: &str = "recording_lists";

/// Wraps a [`RoomsApi`] with caching, circuit breaking and graceful degradation.
///
/// Every component is optional; with none configured calls go straight to
/// upstream. Reads are served from the cache when possible. Writes bypass it
/// and invalidate what they change. Meeting tokens are never cached.
///
/// ```no_run
/// use meetgate::{GatewayConfig, ResilientClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GatewayConfig::from_env()?;
/// let client = ResilientClient::connect(&config)?;
///
/// let rooms = client.list_rooms(&Default::default()).await?;
/// if rooms.is_degraded {
///     println!("upstream is struggling; showing what we have");
/// }
/// # Ok(())
/// # }
/// ```
pub struct ResilientClient<C> {
    inner: Arc<C>,
    cache: Option<Arc<ResponseCache>>,
    breaker: Option<CircuitBreaker>,
    coordinator: Option<DegradationCoordinator>,
}

impl<C> Clone for ResilientClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cache: self.cache.clone(),
            breaker: self.breaker.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

/// Builder for [`ResilientClient`].
pub struct ResilientClientBuilder<C> {
    inner: C,
    cache: Option<Arc<ResponseCache>>,
    breaker: Option<CircuitBreaker>,
    coordinator: Option<DegradationCoordinator>,
}

impl<C: RoomsApi> ResilientClientBuilder<C> {
    /// Caches reads in `cache`.
    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Guards every upstream call with `breaker`.
    pub fn circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Retries and degrades through `coordinator`.
    ///
    /// List operations get an empty-page fallback unless one is already
    /// registered.
    pub fn degradation(mut self, coordinator: DegradationCoordinator) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Builds the client.
    pub fn build(self) -> ResilientClient<C> {
        if let Some(coordinator) = &self.coordinator {
            if !coordinator.has_fallback::<RoomList>("list_rooms") {
                coordinator.register_fallback("list_rooms", FallbackConfig::value(RoomList::empty()));
            }
            if !coordinator.has_fallback::<RecordingList>("list_recordings") {
                coordinator.register_fallback(
                    "list_recordings",
                    FallbackConfig::value(RecordingList::empty()),
                );
            }
        }

        ResilientClient {
            inner: Arc::new(self.inner),
            cache: self.cache,
            breaker: self.breaker,
            coordinator: self.coordinator,
        }
    }
}

impl ResilientClient<HttpRoomsClient> {
    /// An HTTP client wrapped with every component `config` enables.
    pub fn connect(config: &GatewayConfig) -> Result<Self, ApiError> {
        Ok(Self::from_config(HttpRoomsClient::from_config(config)?, config))
    }
}

impl<C: RoomsApi> ResilientClient<C> {
    /// Starts building a client around `inner` with no components enabled.
    pub fn builder(inner: C) -> ResilientClientBuilder<C> {
        ResilientClientBuilder {
            inner,
            cache: None,
            breaker: None,
            coordinator: None,
        }
    }

    /// Wraps `inner` with every component `config` enables. The coordinator
    /// keeps its last-known-good values in the same cache.
    pub fn from_config(inner: C, config: &GatewayConfig) -> Self {
        let mut builder = Self::builder(inner);
        let cache = config.cache.enabled.then(|| Arc::new(config.build_cache()));
        if let Some(cache) = &cache {
            builder = builder.cache(Arc::clone(cache));
        }
        if config.circuit_breaker.enabled {
            builder = builder.circuit_breaker(config.build_circuit_breaker());
        }
        if config.degradation.enabled {
            builder = builder.degradation(config.build_coordinator(cache));
        }
        builder.build()
    }

    /// The wrapped upstream client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The response cache, if enabled.
    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    /// The circuit breaker, if enabled.
    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker> {
        self.breaker.as_ref()
    }

    /// The degradation coordinator, if enabled.
    pub fn coordinator(&self) -> Option<&DegradationCoordinator> {
        self.coordinator.as_ref()
    }

    /// Health of every operation. Always healthy without a coordinator.
    pub fn health(&self) -> HealthReport {
        match &self.coordinator {
            Some(coordinator) => coordinator.health(),
            None => HealthReport {
                overall: HealthStatus::Healthy,
                components: Vec::new(),
            },
        }
    }

    /// Circuit state of every operation called so far.
    pub async fn circuit_states(&self) -> Vec<(String, CircuitState)> {
        match &self.breaker {
            Some(breaker) => breaker.states().await,
            None => Vec::new(),
        }
    }

    async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        slot: Option<(&'static str, &str)>,
        call: F,
    ) -> Result<Degraded<T>, GatewayError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let (Some(cache), Some((namespace, key))) = (&self.cache, slot) {
            if let Some(hit) = cache.get::<T>(namespace, key) {
                return Ok(Degraded::fresh(hit));
            }
        }

        let call = &call;
        let breaker = self.breaker.as_ref();
        let guarded = move || async move {
            match breaker {
                Some(breaker) => breaker.call(operation, call).await,
                None => call().await.map_err(CircuitBreakerError::Inner),
            }
        };

        let result = match &self.coordinator {
            Some(coordinator) => {
                let options = match slot {
                    Some((namespace, key)) => ExecuteOptions::cached(format!("{namespace}:{key}")),
                    None => ExecuteOptions::default(),
                };
                coordinator
                    .execute_with_fallback(operation, options, guarded)
                    .await?
            }
            None => Degraded::fresh(guarded().await?),
        };

        if !result.is_degraded {
            if let (Some(cache), Some((namespace, key))) = (&self.cache, slot) {
                cache.set(namespace, key, result.data.clone(), None);
            }
        }
        Ok(result)
    }

    /// Drops the cached copies of one resource and every page that may list it.
    fn invalidate(&self, namespace: &str, key: Option<&str>, lists: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Some(key) = key {
            cache.invalidate(namespace, key);
            cache.invalidate(FALLBACK_NAMESPACE, &format!("{namespace}:{key}"));
        }
        let _pages = cache.invalidate_namespace(lists);

        #[cfg(feature = "tracing")]
        debug!(namespace, key, pages = _pages, "Invalidated after write");
    }

    /// Lists rooms. Falls back to an empty page when upstream is down.
    pub async fn list_rooms(&self, params: &ListParams) -> Result<Degraded<RoomList>, GatewayError> {
        let key = params.cache_key();
        self.execute("list_rooms", Some((ROOM_LISTS_NAMESPACE, &key)), || {
            self.inner.list_rooms(params)
        })
        .await
    }

    /// Fetches a room.
    pub async fn get_room(&self, name: &str) -> Result<Degraded<Room>, GatewayError> {
        self.execute("get_room", Some((ROOMS_NAMESPACE, name)), || {
            self.inner.get_room(name)
        })
        .await
    }

    /// Creates a room.
    pub async fn create_room(&self, request: &CreateRoom) -> Result<Degraded<Room>, GatewayError> {
        let room = self
            .execute("create_room", None, || self.inner.create_room(request))
            .await?;
        if !room.is_degraded {
            self.invalidate(ROOMS_NAMESPACE, None, ROOM_LISTS_NAMESPACE);
        }
        Ok(room)
    }

    /// Updates a room.
    pub async fn update_room(
        &self,
        name: &str,
        request: &UpdateRoom,
    ) -> Result<Degraded<Room>, GatewayError> {
        let room = self
            .execute("update_room", None, || self.inner.update_room(name, request))
            .await?;
        if !room.is_degraded {
            self.invalidate(ROOMS_NAMESPACE, Some(name), ROOM_LISTS_NAMESPACE);
        }
        Ok(room)
    }

    /// Deletes a room.
    pub async fn delete_room(&self, name: &str) -> Result<Degraded<Deleted>, GatewayError> {
        let deleted = self
            .execute("delete_room", None, || self.inner.delete_room(name))
            .await?;
        if !deleted.is_degraded {
            self.invalidate(ROOMS_NAMESPACE, Some(name), ROOM_LISTS_NAMESPACE);
        }
        Ok(deleted)
    }

    /// Generates a meeting token. Never cached.
    pub async fn generate_room_token(
        &self,
        request: &MeetingTokenRequest,
    ) -> Result<Degraded<MeetingToken>, GatewayError> {
        self.execute("generate_room_token", None, || {
            self.inner.generate_room_token(request)
        })
        .await
    }

    /// Validates a meeting token. Never cached.
    pub async fn validate_room_token(
        &self,
        token: &str,
    ) -> Result<Degraded<TokenValidation>, GatewayError> {
        self.execute("validate_room_token", None, || {
            self.inner.validate_room_token(token)
        })
        .await
    }

    /// Lists recordings. Falls back to an empty page when upstream is down.
    pub async fn list_recordings(
        &self,
        params: &ListParams,
    ) -> Result<Degraded<RecordingList>, GatewayError> {
        let key = params.cache_key();
        self.execute(
            "list_recordings",
            Some((RECORDING_LISTS_NAMESPACE, &key)),
            || self.inner.list_recordings(params),
        )
        .await
    }

    /// Fetches a recording.
    pub async fn get_recording(&self, id: &str) -> Result<Degraded<Recording>, GatewayError> {
        self.execute("get_recording", Some((RECORDINGS_NAMESPACE, id)), || {
            self.inner.get_recording(id)
        })
        .await
    }

    /// Deletes a recording.
    pub async fn delete_recording(&self, id: &str) -> Result<Degraded<Deleted>, GatewayError> {
        let deleted = self
            .execute("delete_recording", None, || self.inner.delete_recording(id))
            .await?;
        if !deleted.is_degraded {
            self.invalidate(RECORDINGS_NAMESPACE, Some(id), RECORDING_LISTS_NAMESPACE);
        }
        Ok(deleted)
    }
}

impl<C> std::fmt::Debug for ResilientClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("cache", &self.cache.is_some())
            .field("circuit_breaker", &self.breaker.is_some())
            .field("degradation", &self.coordinator.is_some())
            .finish()
    }
}
