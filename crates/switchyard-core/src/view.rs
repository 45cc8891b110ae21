//! View registration.
//!
//! Views are terminal handlers keyed by `(network, name, event)`. Each event
//! type may also carry a list of middleware that runs between the generic
//! handler and the view.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::event::{EventTypeSource, NamedEvent};
use crate::handler::Handler;
use crate::lifecycle::{ViewLifecycle, ViewProps};
use crate::metrics;
use crate::router::RouterError;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// `name -> event -> handler`. A `None` leaf marks an unregistered view.
type NameTable = HashMap<String, HashMap<String, Option<Handler>>>;

/// Registered view handlers, one per `(network, name, event)`.
pub struct ViewRegistry {
    /// Views indexed by network.
    views: DashMap<String, NameTable>,
    diagnostics: Diagnostics,
}

impl ViewRegistry {
    #[must_use]
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            views: DashMap::new(),
            diagnostics,
        }
    }

    /// Register `handler` for a named event, replacing any previous view.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NotNamed`] if the signature is incomplete.
    pub fn register(&self, signature: &NamedEvent, handler: Handler) -> Result<(), RouterError> {
        let Some((network, name, event)) = signature.parts() else {
            self.diagnostics.report(Diagnostic::RegisterRequiresNamed);
            return Err(RouterError::NotNamed);
        };

        self.views
            .entry(network.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
            .insert(event.to_string(), Some(handler));

        debug!(network = %network, name = %name, event = %event, "Registered view");
        metrics::set_active_views(self.active_count());
        Ok(())
    }

    /// Mark the view for a named event as unregistered.
    ///
    /// The slot is kept and set to empty, so a view that was never
    /// registered and one already unregistered look the same from outside.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NotNamed`] if the signature is incomplete, or
    /// [`RouterError::ViewNotFound`] if there is no live view to remove.
    pub fn unregister(&self, signature: &NamedEvent) -> Result<(), RouterError> {
        let Some((network, name, event)) = signature.parts() else {
            self.diagnostics.report(Diagnostic::UnregisterRequiresNamed);
            return Err(RouterError::NotNamed);
        };

        let removed = self
            .views
            .get_mut(network)
            .and_then(|mut names| {
                names
                    .get_mut(name)
                    .and_then(|events| events.get_mut(event))
                    .and_then(Option::take)
            })
            .is_some();

        if !removed {
            self.diagnostics.report(Diagnostic::ViewNotFound);
            return Err(RouterError::ViewNotFound {
                network: network.to_string(),
                name: name.to_string(),
                event: event.to_string(),
            });
        }

        debug!(network = %network, name = %name, event = %event, "Unregistered view");
        metrics::set_active_views(self.active_count());
        Ok(())
    }

    /// The live view for a named event.
    #[must_use]
    pub fn lookup(&self, network: &str, name: &str, event: &str) -> Option<Handler> {
        self.views
            .get(network)?
            .get(name)?
            .get(event)?
            .as_ref()
            .map(Arc::clone)
    }

    /// Number of live views.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.views
            .iter()
            .map(|names| {
                names
                    .values()
                    .flat_map(HashMap::values)
                    .filter(|slot| slot.is_some())
                    .count()
            })
            .sum()
    }
}

/// Middleware per event type, run before the view for that type.
pub struct ViewHandlerTable {
    handlers: DashMap<String, Vec<Handler>>,
    diagnostics: Diagnostics,
}

impl ViewHandlerTable {
    #[must_use]
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            handlers: DashMap::new(),
            diagnostics,
        }
    }

    /// Replace the middleware list for an event type with a copy of
    /// `handlers`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MissingEventType`] if no event type can be
    /// read from `source`.
    pub fn set<T>(&self, source: &T, handlers: &[Handler]) -> Result<(), RouterError>
    where
        T: EventTypeSource + ?Sized,
    {
        let Some(event_type) = source.event_type() else {
            self.diagnostics.report(Diagnostic::HandlersMissingType);
            return Err(RouterError::MissingEventType);
        };

        self.handlers.insert(event_type.to_string(), handlers.to_vec());
        debug!(event = %event_type, count = handlers.len(), "Set view handlers");
        Ok(())
    }

    /// The middleware for an event type, in order. Empty if none is set.
    #[must_use]
    pub fn get(&self, event_type: &str) -> Vec<Handler> {
        self.handlers
            .get(event_type)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }
}

/// View-side API of one instance: registration and middleware.
#[derive(Clone)]
pub struct View {
    registry: Arc<ViewRegistry>,
    handlers: Arc<ViewHandlerTable>,
}

impl View {
    #[must_use]
    pub fn new(registry: Arc<ViewRegistry>, handlers: Arc<ViewHandlerTable>) -> Self {
        Self { registry, handlers }
    }

    /// Register a view for a named event.
    ///
    /// # Errors
    ///
    /// See [`ViewRegistry::register`].
    pub fn register(&self, signature: &NamedEvent, handler: Handler) -> Result<(), RouterError> {
        self.registry.register(signature, handler)
    }

    /// Unregister the view for a named event.
    ///
    /// # Errors
    ///
    /// See [`ViewRegistry::unregister`].
    pub fn unregister(&self, signature: &NamedEvent) -> Result<(), RouterError> {
        self.registry.unregister(signature)
    }

    /// Set the middleware every view of an event type goes through.
    ///
    /// # Errors
    ///
    /// See [`ViewHandlerTable::set`].
    pub fn handlers<T>(&self, source: &T, handlers: &[Handler]) -> Result<(), RouterError>
    where
        T: EventTypeSource + ?Sized,
    {
        self.handlers.set(source, handlers)
    }

    /// Bind a view handler to a component's mount lifecycle.
    #[must_use]
    pub fn lifecycle(
        &self,
        event: impl Into<String>,
        props: &ViewProps,
        handler: Handler,
    ) -> ViewLifecycle {
        ViewLifecycle::new(self.clone(), props.signature(event), handler)
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ViewRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn handler_table(&self) -> &Arc<ViewHandlerTable> {
        &self.handlers
    }
}
