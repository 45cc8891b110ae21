//! Handler types.
//!
//! A route is made of two kinds of stage: the generic [`EventHandler`] that
//! opens every route (and also drives the state fold for its event type),
//! and plain [`Handler`]s used for view middleware and view handlers.

use crate::event::Event;
use crate::route::Next;
use dashmap::DashMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A middleware or view stage: `(event, advance)`.
pub type Handler = Arc<dyn Fn(Event, Next) + Send + Sync>;

/// The opening stage of a route: `(event, state, advance)`.
pub type RouteFn = Arc<dyn Fn(Event, Value, Next) + Send + Sync>;

/// Folds an event into its own slot: `(event, network_state) -> value`.
///
/// `None` means "leave the slot alone".
pub type ReduceFn = Arc<dyn Fn(&Event, Value) -> Option<Value> + Send + Sync>;

/// Outbound sink receiving the argument list of every `send`.
pub type Sink = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(Event, Next) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The generic handler for one event type.
///
/// It runs first in every route for its type, and it is the only function
/// allowed to write that type's slot in the state tree.
#[derive(Clone)]
pub struct EventHandler {
    route: RouteFn,
    reduce: ReduceFn,
}

impl EventHandler {
    /// A handler that folds events with `reduce` and advances its route
    /// straight away.
    pub fn new<F>(reduce: F) -> Self
    where
        F: Fn(&Event, Value) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            route: Arc::new(|_: Event, _: Value, next: Next| next.advance()),
            reduce: Arc::new(reduce),
        }
    }

    /// A handler that only takes part in routing and never writes state.
    pub fn on_route<F>(route: F) -> Self
    where
        F: Fn(Event, Value, Next) + Send + Sync + 'static,
    {
        Self {
            route: Arc::new(route),
            reduce: Arc::new(|_: &Event, _: Value| -> Option<Value> { None }),
        }
    }

    /// Replace the routing stage.
    #[must_use]
    pub fn with_route<F>(mut self, route: F) -> Self
    where
        F: Fn(Event, Value, Next) + Send + Sync + 'static,
    {
        self.route = Arc::new(route);
        self
    }

    /// Replace the reduce function.
    #[must_use]
    pub fn with_reducer<F>(mut self, reduce: F) -> Self
    where
        F: Fn(&Event, Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.reduce = Arc::new(reduce);
        self
    }

    /// The routing stage, shared rather than copied.
    #[must_use]
    pub fn route_fn(&self) -> RouteFn {
        Arc::clone(&self.route)
    }

    /// Run the reduce function.
    pub fn reduce(&self, event: &Event, state: Value) -> Option<Value> {
        (self.reduce)(event, state)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler").finish_non_exhaustive()
    }
}

/// Generic handlers keyed by event type. At most one per type.
#[derive(Debug, Default)]
pub struct EventTable {
    handlers: DashMap<String, EventHandler>,
}

impl EventTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler, returning the one it replaced.
    pub fn insert(&self, event_type: impl Into<String>, handler: EventHandler) -> Option<EventHandler> {
        self.handlers.insert(event_type.into(), handler)
    }

    /// The handler for `event_type`.
    #[must_use]
    pub fn get(&self, event_type: &str) -> Option<EventHandler> {
        self.handlers.get(event_type).map(|h| h.value().clone())
    }

    #[must_use]
    pub fn contains(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// All registered event types.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.handlers.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_handler_reduce() {
        let h = EventHandler::new(|event, _| event.get("nick").cloned());
        let event = Event::new("nick").with_field("nick", "ferris");
        assert_eq!(h.reduce(&event, Value::Null), Some(json!("ferris")));
    }

    #[test]
    fn test_route_only_handler_never_writes() {
        let h = EventHandler::on_route(|_, _, next| next.advance());
        assert_eq!(h.reduce(&Event::new("x"), json!({ "a": 1 })), None);
    }

    #[test]
    fn test_event_table_replaces() {
        let table = EventTable::new();
        assert!(table
            .insert("hi", EventHandler::new(|_, _| Some(json!(1))))
            .is_none());
        assert!(table
            .insert("hi", EventHandler::new(|_, _| Some(json!(2))))
            .is_some());

        assert_eq!(table.len(), 1);
        let active = table.get("hi").unwrap();
        assert_eq!(active.reduce(&Event::new("hi"), Value::Null), Some(json!(2)));
        assert!(table.get("missing").is_none());
    }

    #[test]
    fn test_route_handler_with_reducer() {
        let h = EventHandler::on_route(|_, _, next| next.advance())
            .with_reducer(|event, _| event.get("topic").cloned());
        let event = Event::new("topic").with_field("topic", "rust");
        assert_eq!(h.reduce(&event, Value::Null), Some(json!("rust")));
    }

    #[test]
    fn test_event_types() {
        let table = EventTable::new();
        assert!(table.is_empty());
        table.insert("nick", EventHandler::new(|_, _| None));
        table.insert("join", EventHandler::new(|_, _| None));

        let mut types = table.event_types();
        types.sort();
        assert_eq!(types, vec!["join".to_string(), "nick".to_string()]);
        assert!(table.contains("join"));
    }
}
