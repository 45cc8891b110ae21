//! Event records routed through Switchyard.
//!
//! An event carries its routing keys (`event`, `network`, `name`) next to an
//! arbitrary payload. The router only ever reads the routing keys; every
//! other field is passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An inbound protocol event such as `nick`, `join` or `msg`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type, used to look up the generic handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Network (connection group) the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Named resource within the network, e.g. a room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Everything else on the record.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Create an event of the given type.
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            ..Self::default()
        }
    }

    /// Set the network.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Set the named resource.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The event type, if present and non-empty.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        non_empty(self.event.as_deref())
    }

    /// The network, if present and non-empty.
    #[must_use]
    pub fn network(&self) -> Option<&str> {
        non_empty(self.network.as_deref())
    }

    /// The named resource, if present and non-empty.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    /// Look up a payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Look up a payload field for mutation.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.payload.get_mut(key)
    }

    /// Whether the event carries both a network and a name.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.network().is_some() && self.name().is_some()
    }
}

/// The routing signature of a view: `(network, name, event)`.
///
/// Any part may be missing; registration checks completeness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedEvent {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
}

impl NamedEvent {
    /// Create a complete signature.
    #[must_use]
    pub fn new(
        network: impl Into<String>,
        name: impl Into<String>,
        event: impl Into<String>,
    ) -> Self {
        Self {
            network: Some(network.into()),
            name: Some(name.into()),
            event: Some(event.into()),
        }
    }

    /// Returns `(network, name, event)` when all three are present and
    /// non-empty.
    #[must_use]
    pub fn parts(&self) -> Option<(&str, &str, &str)> {
        Some((
            non_empty(self.network.as_deref())?,
            non_empty(self.name.as_deref())?,
            non_empty(self.event.as_deref())?,
        ))
    }
}

impl From<&Event> for NamedEvent {
    fn from(event: &Event) -> Self {
        Self {
            network: event.network.clone(),
            name: event.name.clone(),
            event: event.event.clone(),
        }
    }
}

/// Anything an event type can be read from: a plain string, or a record
/// with an `event` field.
pub trait EventTypeSource {
    /// The event type, or `None` if none can be found.
    fn event_type(&self) -> Option<&str>;
}

impl EventTypeSource for str {
    fn event_type(&self) -> Option<&str> {
        non_empty(Some(self))
    }
}

impl EventTypeSource for String {
    fn event_type(&self) -> Option<&str> {
        non_empty(Some(self.as_str()))
    }
}

impl EventTypeSource for Event {
    fn event_type(&self) -> Option<&str> {
        Event::event_type(self)
    }
}

impl EventTypeSource for NamedEvent {
    fn event_type(&self) -> Option<&str> {
        non_empty(self.event.as_deref())
    }
}

impl EventTypeSource for Value {
    fn event_type(&self) -> Option<&str> {
        match self {
            Value::String(s) => non_empty(Some(s.as_str())),
            Value::Object(map) => non_empty(map.get("event").and_then(Value::as_str)),
            _ => None,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let event = Event::new("msg")
            .with_network("libera")
            .with_name("#rust")
            .with_field("text", "hello");

        assert_eq!(event.event_type(), Some("msg"));
        assert_eq!(event.network(), Some("libera"));
        assert_eq!(event.name(), Some("#rust"));
        assert_eq!(event.get("text"), Some(&json!("hello")));
        assert!(event.is_named());
    }

    #[test]
    fn test_empty_keys_are_absent() {
        let event: Event = serde_json::from_value(json!({
            "event": "",
            "network": "libera",
            "name": ""
        }))
        .unwrap();

        assert_eq!(event.event_type(), None);
        assert_eq!(event.name(), None);
        assert!(!event.is_named());
    }

    #[test]
    fn test_payload_passes_through() {
        let raw = json!({
            "event": "nick",
            "network": "libera",
            "nick": "ferris",
            "meta": { "ts": 12 }
        });

        let event: Event = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(event.get("nick"), Some(&json!("ferris")));
        assert_eq!(event.name, None);
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }

    #[test]
    fn test_named_event_parts() {
        assert_eq!(
            NamedEvent::new("a", "b", "c").parts(),
            Some(("a", "b", "c"))
        );

        let partial = NamedEvent {
            network: Some("a".into()),
            name: Some("b".into()),
            event: None,
        };
        assert_eq!(partial.parts(), None);

        let from_event = NamedEvent::from(&Event::new("msg").with_network("n"));
        assert_eq!(from_event.parts(), None);
    }

    #[test]
    fn test_event_type_sources() {
        assert_eq!(EventTypeSource::event_type("msg"), Some("msg"));
        assert_eq!(EventTypeSource::event_type(""), None);
        assert_eq!(
            EventTypeSource::event_type(&json!({ "event": "msg", "other": "stuff" })),
            Some("msg")
        );
        assert_eq!(EventTypeSource::event_type(&json!({ "x": 1, "y": 2 })), None);
        assert_eq!(EventTypeSource::event_type(&json!(12)), None);
    }
}
