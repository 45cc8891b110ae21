//! One self-contained Switchyard instance.

use crate::diagnostics::Diagnostics;
use crate::reducer::StateReducer;
use crate::router::{EventRouter, RouterConfig};
use crate::view::{View, ViewHandlerTable, ViewRegistry};
use std::fmt;
use std::sync::Arc;

/// A router plus its view API, sharing one set of tables.
///
/// Every call to [`Switchyard::new`] builds fresh tables; instances never
/// share handlers, views or state.
#[derive(Clone)]
pub struct Switchyard {
    router: EventRouter,
    view: View,
}

impl Switchyard {
    /// Create an instance with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Create an instance with custom configuration.
    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        let diagnostics = Diagnostics::new(config.diagnostics);
        let registry = Arc::new(ViewRegistry::new(diagnostics.clone()));
        let handlers = Arc::new(ViewHandlerTable::new(diagnostics.clone()));

        Self {
            router: EventRouter::with_views(
                Arc::clone(&registry),
                Arc::clone(&handlers),
                diagnostics,
            ),
            view: View::new(registry, handlers),
        }
    }

    #[must_use]
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    #[must_use]
    pub fn view(&self) -> &View {
        &self.view
    }

    #[must_use]
    pub fn reducer(&self) -> &StateReducer {
        self.router.reducer()
    }

    /// Log `parts` when `condition` holds. See [`Diagnostics::warn`].
    pub fn warn<I, S>(&self, condition: bool, parts: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: fmt::Display,
    {
        self.router.diagnostics().warn(condition, parts)
    }
}

impl Default for Switchyard {
    fn default() -> Self {
        Self::new()
    }
}
