//! Operation-scoped events.
//!
//! Each component reports what it does to an upstream operation (`get_room`,
//! `list_rooms`, ...) as a typed event. Listeners either watch every
//! operation or subscribe to one, so a dashboard tracking `create_room` is
//! not woken up by every cache hit on `get_room`.
//!
//! Any `Fn(&E) + Send + Sync` closure is a listener.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// The component an event comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// The response cache.
    Cache,
    /// The per-operation circuit breaker.
    CircuitBreaker,
    /// The degradation coordinator.
    Degradation,
}

impl Component {
    /// A stable name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Component::Cache => "cache",
            Component::CircuitBreaker => "circuit_breaker",
            Component::Degradation => "degradation",
        }
    }
}

/// An event about one upstream operation.
pub trait GatewayEvent: Send + Sync + fmt::Debug {
    /// The component that emitted the event.
    fn component(&self) -> Component;

    /// Short name of the event, e.g. `"state_transition"` or `"retry"`.
    fn event_type(&self) -> &'static str;

    /// When the event occurred.
    fn timestamp(&self) -> Instant;

    /// The operation the event is about.
    ///
    /// Cache events report their namespace, which is how the cache groups
    /// an operation's responses.
    fn operation(&self) -> &str;
}

/// Receives events of type `E`.
pub trait EventListener<E: GatewayEvent>: Send + Sync {
    /// Called for every event the listener is subscribed to.
    fn on_event(&self, event: &E);
}

impl<E, F> EventListener<E> for F
where
    E: GatewayEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        self(event)
    }
}

/// Which operations a listener hears about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every operation.
    All,
    /// Only the named operation.
    Operation(String),
}

impl Scope {
    /// Whether an event about `operation` reaches this scope.
    pub fn matches(&self, operation: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Operation(name) => name == operation,
        }
    }
}

struct Subscription<E: GatewayEvent> {
    scope: Scope,
    listener: Arc<dyn EventListener<E>>,
}

impl<E: GatewayEvent> Clone for Subscription<E> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            listener: Arc::clone(&self.listener),
        }
    }
}

/// The listeners registered on one component.
///
/// Clones share the underlying listeners.
pub struct EventListeners<E: GatewayEvent> {
    subscriptions: Vec<Subscription<E>>,
}

impl<E: GatewayEvent> EventListeners<E> {
    /// An empty collection.
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Subscribes `listener` to every operation.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscribe(Scope::All, listener);
    }

    /// Subscribes `listener` to events about `operation` only.
    pub fn add_for<L>(&mut self, operation: impl Into<String>, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscribe(Scope::Operation(operation.into()), listener);
    }

    /// Subscribes `listener` to `scope`.
    pub fn subscribe<L>(&mut self, scope: Scope, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscriptions.push(Subscription {
            scope,
            listener: Arc::new(listener),
        });
    }

    /// Delivers `event` to every listener whose scope covers its operation,
    /// in registration order.
    ///
    /// A panicking listener is isolated; the remaining listeners still run.
    pub fn emit(&self, event: &E) {
        let operation = event.operation();
        for subscription in &self.subscriptions {
            if !subscription.scope.matches(operation) {
                continue;
            }

            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                subscription.listener.on_event(event);
            }));

            if outcome.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    component = event.component().as_str(),
                    event_type = event.event_type(),
                    operation,
                    "Event listener panicked"
                );
            }
        }
    }

    /// Whether any listener would receive an event about `operation`.
    pub fn listens_to(&self, operation: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|subscription| subscription.scope.matches(operation))
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Number of registered listeners, scoped or not.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }
}

impl<E: GatewayEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            subscriptions: self.subscriptions.clone(),
        }
    }
}

impl<E: GatewayEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: GatewayEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scoped: Vec<&str> = self
            .subscriptions
            .iter()
            .filter_map(|subscription| match &subscription.scope {
                Scope::All => None,
                Scope::Operation(name) => Some(name.as_str()),
            })
            .collect();
        f.debug_struct("EventListeners")
            .field("len", &self.subscriptions.len())
            .field("scoped_to", &scoped)
            .finish()
    }
}
