//! Event router for Switchyard.
//!
//! The router owns the generic handler table and the state tree. Each
//! received event is run through a route built from the generic handler,
//! the view middleware for its type and the view registered for its
//! `(network, name, event)` triple. When the route completes, the event is
//! folded into the state tree.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::event::Event;
use crate::handler::{EventHandler, EventTable, Sink};
use crate::metrics;
use crate::reducer::{scope_key, StateReducer, StateTree};
use crate::route::Route;
use crate::view::{ViewHandlerTable, ViewRegistry};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

/// Router errors.
///
/// Every variant except [`RouterError::NoSink`] is also reported as a
/// [`Diagnostic`]; callers may ignore them.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Event has no event type.
    #[error("Invalid event: missing event type")]
    InvalidEvent,

    /// No generic handler for the event type.
    #[error("No handlers for event: {0}")]
    NoHandlers(String),

    /// Event type rejected by `set_event`.
    #[error("Invalid event type: {0:?}")]
    InvalidEventType(String),

    /// View signature lacks network, name or event.
    #[error("View signature requires network, name and event")]
    NotNamed,

    /// No live view to unregister.
    #[error("View not found: {network}/{name}/{event}")]
    ViewNotFound {
        network: String,
        name: String,
        event: String,
    },

    /// No event type could be inferred.
    #[error("Cannot find event type")]
    MissingEventType,

    /// `send` was called before a sink was installed.
    #[error("No send sink configured")]
    NoSink,
}

/// Router configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Whether diagnostics are logged. Aborts happen either way.
    pub diagnostics: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            diagnostics: cfg!(debug_assertions),
        }
    }
}

struct RouterInner {
    /// Generic handlers indexed by event type.
    events: Arc<EventTable>,
    views: Arc<ViewRegistry>,
    view_handlers: Arc<ViewHandlerTable>,
    reducer: StateReducer,
    state: Mutex<StateTree>,
    sink: RwLock<Option<Sink>>,
    diagnostics: Diagnostics,
}

/// The event router.
///
/// Cloning is cheap and yields a handle to the same router.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

impl EventRouter {
    /// Create a router with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Create a router with custom configuration.
    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        let diagnostics = Diagnostics::new(config.diagnostics);
        Self::with_views(
            Arc::new(ViewRegistry::new(diagnostics.clone())),
            Arc::new(ViewHandlerTable::new(diagnostics.clone())),
            diagnostics,
        )
    }

    /// Create a router over existing view tables.
    #[must_use]
    pub fn with_views(
        views: Arc<ViewRegistry>,
        view_handlers: Arc<ViewHandlerTable>,
        diagnostics: Diagnostics,
    ) -> Self {
        info!(diagnostics = diagnostics.enabled(), "Creating event router");
        let events = Arc::new(EventTable::new());
        Self {
            inner: Arc::new(RouterInner {
                reducer: StateReducer::new(Arc::clone(&events)),
                events,
                views,
                view_handlers,
                state: Mutex::new(StateTree::new()),
                sink: RwLock::new(None),
                diagnostics,
            }),
        }
    }

    /// Dispatch an inbound event.
    ///
    /// Builds the route for the event and runs it. Once the last stage
    /// advances, the event as received is folded into the state tree; stages
    /// may replace the event they pass along, but that never changes which
    /// slot gets written. A stage that never advances leaves the state
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns an error, after reporting a diagnostic, if the event has no
    /// type or no generic handler is registered for it.
    pub fn receive(&self, event: Event) -> Result<(), RouterError> {
        metrics::record_received();
        let route = self.route_for(&event)?;

        let inner = Arc::clone(&self.inner);
        let received = event.clone();
        route.run(event, move |_| {
            inner.reducer.fold_into(&inner.state, &received);
            metrics::record_completed();
        });
        Ok(())
    }

    /// Build the route for an event without running it.
    ///
    /// The route is `[generic, ...middleware, view]` for named events with a
    /// registered view, and just `[generic]` otherwise.
    ///
    /// # Errors
    ///
    /// See [`EventRouter::receive`].
    pub fn route_for(&self, event: &Event) -> Result<Route, RouterError> {
        let Some(event_type) = event.event_type() else {
            self.inner.diagnostics.report(Diagnostic::InvalidEvent);
            metrics::record_dropped("invalid");
            return Err(RouterError::InvalidEvent);
        };

        let Some(generic) = self.inner.events.get(event_type) else {
            self.inner.diagnostics.report(Diagnostic::NoHandlers {
                event: event_type.to_string(),
            });
            metrics::record_dropped("no_handlers");
            return Err(RouterError::NoHandlers(event_type.to_string()));
        };

        let mut route = Route::from_head(generic.route_fn());

        if let (Some(network), Some(name)) = (event.network(), event.name()) {
            match self.inner.views.lookup(network, name, event_type) {
                Some(view) => {
                    route.extend(self.inner.view_handlers.get(event_type));
                    route.push(view);
                }
                None => self.inner.diagnostics.report(Diagnostic::MissingView {
                    event: event_type.to_string(),
                    network: network.to_string(),
                    name: name.to_string(),
                }),
            }
        }

        trace!(event = %event_type, stages = route.len(), "Built route");
        Ok(route)
    }

    /// Set or replace the generic handler for an event type.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidEventType`] for an empty event type,
    /// leaving the table untouched.
    pub fn set_event(
        &self,
        event_type: impl Into<String>,
        handler: EventHandler,
    ) -> Result<(), RouterError> {
        let event_type = event_type.into();
        if event_type.is_empty() {
            self.inner
                .diagnostics
                .report(Diagnostic::InvalidEventHandler {
                    event: event_type.clone(),
                });
            return Err(RouterError::InvalidEventType(event_type));
        }

        let replaced = self.inner.events.insert(event_type.clone(), handler).is_some();
        debug!(event = %event_type, replaced, "Set event handler");
        Ok(())
    }

    /// Whether a generic handler is registered for an event type.
    #[must_use]
    pub fn has_event(&self, event_type: &str) -> bool {
        self.inner.events.contains(event_type)
    }

    /// Install the outbound sink, replacing any previous one.
    pub fn send_handler<F>(&self, sink: F)
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        *self.inner.sink.write() = Some(Arc::new(sink));
        debug!("Installed send handler");
    }

    /// Install a channel as the outbound sink and return its receiving end.
    pub fn send_channel(&self) -> mpsc::UnboundedReceiver<Vec<Value>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send_handler(move |args| {
            if tx.send(args).is_err() {
                debug!("Outbound receiver dropped");
            }
        });
        rx
    }

    /// Relay `args` unchanged to the outbound sink.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NoSink`] if no sink has been installed.
    pub fn send(&self, args: Vec<Value>) -> Result<(), RouterError> {
        let sink = self.inner.sink.read().clone();
        match sink {
            Some(sink) => {
                metrics::record_outbound();
                sink(args);
                Ok(())
            }
            None => {
                error!("send called before a send handler was installed");
                Err(RouterError::NoSink)
            }
        }
    }

    /// A copy of the whole state tree.
    #[must_use]
    pub fn state(&self) -> StateTree {
        self.inner.state.lock().clone()
    }

    /// A copy of one network's state.
    #[must_use]
    pub fn network_state(&self, network: &str) -> Option<Value> {
        self.inner.state.lock().get(network).cloned()
    }

    /// A copy of one named scope within a network.
    #[must_use]
    pub fn scoped_state(&self, network: &str, name: &str) -> Option<Value> {
        self.inner
            .state
            .lock()
            .get(network)?
            .get(scope_key(name))
            .cloned()
    }

    /// The reducer over this router's handler table.
    #[must_use]
    pub fn reducer(&self) -> &StateReducer {
        &self.inner.reducer
    }

    /// The diagnostic channel shared with the view tables.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    /// The view registry consulted when building routes.
    #[must_use]
    pub fn views(&self) -> &Arc<ViewRegistry> {
        &self.inner.views
    }

    /// The view middleware table consulted when building routes.
    #[must_use]
    pub fn view_handlers(&self) -> &Arc<ViewHandlerTable> {
        &self.inner.view_handlers
    }

    /// Router statistics.
    #[must_use]
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            event_types: self.inner.events.len(),
            active_views: self.inner.views.active_count(),
            networks: self.inner.state.lock().len(),
        }
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Router statistics.
#[derive(Debug, Clone)]
pub struct RouterStats {
    /// Number of event types with a generic handler.
    pub event_types: usize,
    /// Number of registered views.
    pub active_views: usize,
    /// Number of networks in the state tree.
    pub networks: usize,
}
