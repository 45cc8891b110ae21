//! Scoped state reduction.
//!
//! The state tree is laid out per network:
//!
//! ```text
//! {
//!   "<network>": {
//!     "<event type>": value,
//!     "_$<name>": { "<event type>": value }
//!   }
//! }
//! ```
//!
//! The generic handler for an event type folds each event into exactly one
//! slot: `state[network][type]`, or `state[network]["_$" + name][type]` for
//! named events. It reads an owned copy of its own network and hands back
//! an owned value, so no reference into the tree ever escapes.

use crate::event::Event;
use crate::handler::{EventHandler, EventTable};
use parking_lot::{Mutex, ReentrantMutex};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::trace;

/// Key prefix for named-resource scopes inside a network.
pub const SCOPE_PREFIX: &str = "_$";

/// The whole state tree, keyed by network.
pub type StateTree = Map<String, Value>;

/// Key of the scope for a named resource.
#[must_use]
pub fn scope_key(name: &str) -> String {
    format!("{SCOPE_PREFIX}{name}")
}

/// Folds events into a [`StateTree`] using the generic handler table.
#[derive(Debug, Clone)]
pub struct StateReducer {
    events: Arc<EventTable>,
    /// Held from copy to commit so concurrent folds never interleave.
    fold: Arc<ReentrantMutex<()>>,
}

impl StateReducer {
    #[must_use]
    pub fn new(events: Arc<EventTable>) -> Self {
        Self {
            events,
            fold: Arc::new(ReentrantMutex::new(())),
        }
    }

    /// Fold `action` into `state` and return it.
    ///
    /// Returns `state` untouched when no handler is registered for the
    /// action's type. Otherwise the network container (and the named scope,
    /// for named events) always exists afterwards, even if the handler chose
    /// not to write.
    #[must_use]
    pub fn reduce(&self, mut state: StateTree, action: &Event) -> StateTree {
        let Some((event_type, handler)) = self.handler_for(action) else {
            return state;
        };

        let slice = network_slice(&state, action);
        let result = handler.reduce(action, slice);
        commit(&mut state, action, event_type, result);
        state
    }

    /// Fold `action` into a shared tree.
    ///
    /// Folds are serialized from copy to commit. The state lock itself is
    /// released while the handler runs, so it may read the router's state;
    /// a fold started from inside a handler on the same thread proceeds.
    pub(crate) fn fold_into(&self, state: &Mutex<StateTree>, action: &Event) {
        let Some((event_type, handler)) = self.handler_for(action) else {
            return;
        };

        let _fold = self.fold.lock();

        let slice = network_slice(&state.lock(), action);
        let result = handler.reduce(action, slice);
        trace!(event = %event_type, write = result.is_some(), "Folding event");
        commit(&mut state.lock(), action, event_type, result);
    }

    fn handler_for<'a>(&self, action: &'a Event) -> Option<(&'a str, EventHandler)> {
        let event_type = action.event_type()?;
        let handler = self.events.get(event_type)?;
        Some((event_type, handler))
    }
}

fn network_key(action: &Event) -> &str {
    action.network().unwrap_or_default()
}

/// Owned copy of the action's network, or `null` if it has none yet.
fn network_slice(state: &StateTree, action: &Event) -> Value {
    state
        .get(network_key(action))
        .cloned()
        .unwrap_or(Value::Null)
}

fn commit(state: &mut StateTree, action: &Event, event_type: &str, result: Option<Value>) {
    let network = object_slot(state, network_key(action));
    let target = match action.name() {
        Some(name) => object_slot(network, &scope_key(name)),
        None => network,
    };

    if let Some(value) = result {
        target.insert(event_type.to_string(), value);
    }
}

/// The object at `key`, created (or replacing a non-object) if needed.
fn object_slot<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(inner) => inner,
        _ => unreachable!("slot was made an object above"),
    }
}
