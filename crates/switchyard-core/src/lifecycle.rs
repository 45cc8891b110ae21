//! Mount/unmount glue for view components.
//!
//! A component knows its own `network` and `name`; binding it to an event
//! type gives the signature its view is registered under while mounted.

use crate::event::NamedEvent;
use crate::handler::Handler;
use crate::router::RouterError;
use crate::view::View;
use serde::{Deserialize, Serialize};

/// The routing properties a view component is mounted with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewProps {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ViewProps {
    #[must_use]
    pub fn new(network: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            network: Some(network.into()),
            name: Some(name.into()),
        }
    }

    /// The signature for `event` under these props.
    #[must_use]
    pub fn signature(&self, event: impl Into<String>) -> NamedEvent {
        NamedEvent {
            network: self.network.clone(),
            name: self.name.clone(),
            event: Some(event.into()),
        }
    }
}

/// A view handler bound to a fixed signature, registered on mount and
/// unregistered on unmount.
pub struct ViewLifecycle {
    view: View,
    signature: NamedEvent,
    handler: Handler,
}

impl ViewLifecycle {
    pub(crate) fn new(view: View, signature: NamedEvent, handler: Handler) -> Self {
        Self {
            view,
            signature,
            handler,
        }
    }

    /// The signature this lifecycle registers under.
    #[must_use]
    pub fn signature(&self) -> &NamedEvent {
        &self.signature
    }

    /// Register the view.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NotNamed`] if the props were incomplete.
    pub fn on_before_mount(&self) -> Result<(), RouterError> {
        self.view.register(&self.signature, self.handler.clone())
    }

    /// Unregister the view.
    ///
    /// # Errors
    ///
    /// Returns an error if the props were incomplete or the view is not
    /// currently registered.
    pub fn on_before_unmount(&self) -> Result<(), RouterError> {
        self.view.unregister(&self.signature)
    }
}
