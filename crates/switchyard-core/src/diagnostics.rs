//! Diagnostic reporting.
//!
//! Every recoverable failure in the router is reported here rather than
//! raised. Reporting only decides whether something gets *logged*; whether
//! an operation aborts is decided by the caller and does not depend on
//! diagnostics being enabled.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A diagnostic raised by the router or the view tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `receive` was handed an event without an event type.
    InvalidEvent,
    /// No generic handler is registered for the event type.
    NoHandlers { event: String },
    /// A named event arrived but no view is registered for it.
    MissingView {
        event: String,
        network: String,
        name: String,
    },
    /// `set_event` was called with an unusable event type.
    InvalidEventHandler { event: String },
    /// `register` was called without a complete signature.
    RegisterRequiresNamed,
    /// `unregister` was called without a complete signature.
    UnregisterRequiresNamed,
    /// `unregister` found nothing to remove.
    ViewNotFound,
    /// `handlers` could not infer an event type.
    HandlersMissingType,
    /// Free-form message from [`Diagnostics::warn`].
    Message(String),
}

impl Diagnostic {
    /// Soft diagnostics describe an expected situation; the operation went
    /// ahead anyway.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::MissingView { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEvent => write!(f, "Invalid event passed to EventRouter::receive"),
            Self::NoHandlers { event } => {
                write!(f, "Received event [ {event} ] but no handlers found")
            }
            Self::MissingView {
                event,
                network,
                name,
            } => write!(
                f,
                "Expected event {event} ({network}, {name}) to have view, but none found -- If ok this is safe to ignore"
            ),
            Self::InvalidEventHandler { event } => write!(
                f,
                "Error setting event handler, expect (string, function) got ({event:?}, function)"
            ),
            Self::RegisterRequiresNamed => write!(f, "Registering a view requires a 'named' event"),
            Self::UnregisterRequiresNamed => {
                write!(f, "Unregistering a view requires a 'named' event")
            }
            Self::ViewNotFound => write!(f, "Expected to unregister view, but no view found"),
            Self::HandlersMissingType => write!(f, "Call to handlers cannot find event type"),
            Self::Message(message) => f.write_str(message),
        }
    }
}

/// Callback receiving every diagnostic that gets logged.
pub type Observer = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// Diagnostic channel shared by one router instance and its view tables.
#[derive(Clone)]
pub struct Diagnostics {
    enabled: bool,
    observer: Arc<RwLock<Option<Observer>>>,
}

impl Diagnostics {
    /// Create a diagnostic channel.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            observer: Arc::new(RwLock::new(None)),
        }
    }

    /// Whether diagnostics are logged at all.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Install an observer, replacing any previous one.
    pub fn set_observer<F>(&self, observer: F)
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        *self.observer.write() = Some(Arc::new(observer));
    }

    /// Remove the observer.
    pub fn clear_observer(&self) {
        *self.observer.write() = None;
    }

    /// Log a diagnostic. Does nothing when diagnostics are disabled.
    pub fn report(&self, diagnostic: Diagnostic) {
        if !self.enabled {
            return;
        }

        if diagnostic.is_soft() {
            warn!(soft = true, "{}", diagnostic);
        } else {
            warn!("{}", diagnostic);
        }

        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer(&diagnostic);
        }
    }

    /// Log `parts` joined by spaces when `condition` holds.
    ///
    /// Returns `condition` when diagnostics are enabled and `false` when they
    /// are disabled. The router never branches on this return value.
    pub fn warn<I, S>(&self, condition: bool, parts: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: fmt::Display,
    {
        if !self.enabled || !condition {
            return false;
        }

        let message = parts
            .into_iter()
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.report(Diagnostic::Message(message));
        true
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(cfg!(debug_assertions))
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .field("observer", &self.observer.read().is_some())
            .finish()
    }
}

/// Test helper collecting reported diagnostics.
#[cfg(test)]
pub(crate) fn capture(diagnostics: &Diagnostics) -> Arc<parking_lot::Mutex<Vec<Diagnostic>>> {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    diagnostics.set_observer(move |d| sink.lock().push(d.clone()));
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_returns_condition() {
        let diagnostics = Diagnostics::new(true);
        let seen = capture(&diagnostics);

        assert!(!diagnostics.warn(1 == 2, ["doesn't warn"]));
        assert!(diagnostics.warn(true, ["hi", "test"]));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].to_string(), "hi test");
    }

    #[test]
    fn test_warn_disabled_is_silent() {
        let diagnostics = Diagnostics::new(false);
        let seen = capture(&diagnostics);

        assert!(!diagnostics.warn(true, ["never", "logged"]));
        diagnostics.report(Diagnostic::InvalidEvent);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_messages() {
        assert!(Diagnostic::InvalidEvent.to_string().starts_with("Invalid event"));
        assert!(Diagnostic::NoHandlers { event: "x".into() }
            .to_string()
            .starts_with("Received event"));

        let missing = Diagnostic::MissingView {
            event: "msg".into(),
            network: "n".into(),
            name: "#r".into(),
        };
        assert!(missing.is_soft());
        assert!(missing.to_string().starts_with("Expected event msg (n, #r)"));
        assert!(Diagnostic::InvalidEventHandler { event: String::new() }
            .to_string()
            .starts_with("Error setting"));
    }

    #[test]
    fn test_clear_observer() {
        let diagnostics = Diagnostics::new(true);
        let seen = capture(&diagnostics);
        diagnostics.clear_observer();
        diagnostics.report(Diagnostic::ViewNotFound);
        assert!(seen.lock().is_empty());
    }
}
