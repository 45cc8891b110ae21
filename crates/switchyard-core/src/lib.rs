//! # switchyard-core
//!
//! In-process event routing and scoped state reduction for chat-style
//! clients.
//!
//! This crate provides the building blocks:
//!
//! - **EventRouter** - Dispatches events through generic handlers, view
//!   middleware and views
//! - **Route** - Continuation-passing execution of one dispatch
//! - **ViewRegistry** / **ViewHandlerTable** - Views and their middleware
//! - **StateReducer** - Folds events into a per-network state tree
//! - **Switchyard** - One independent instance of all of the above
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────┐
//! │  Transport  │────▶│   Router    │────▶│  Middleware  │────▶│  View   │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────┘
//!                            │ on completion
//!                            ▼
//!                     ┌─────────────┐
//!                     │   Reducer   │
//!                     └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use switchyard_core::{Event, EventHandler, Switchyard};
//!
//! let yard = Switchyard::new();
//! yard.router()
//!     .set_event("nick", EventHandler::new(|event, _state| event.get("nick").cloned()))
//!     .unwrap();
//!
//! yard.router()
//!     .receive(Event::new("nick").with_network("libera").with_field("nick", "ferris"))
//!     .unwrap();
//!
//! assert_eq!(
//!     yard.router().network_state("libera"),
//!     Some(json!({ "nick": "ferris" }))
//! );
//! ```

pub mod diagnostics;
pub mod event;
pub mod facade;
pub mod handler;
pub mod lifecycle;
pub mod metrics;
pub mod reducer;
pub mod route;
pub mod router;
pub mod view;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use event::{Event, EventTypeSource, NamedEvent};
pub use facade::Switchyard;
pub use handler::{handler, EventHandler, EventTable, Handler, Sink};
pub use lifecycle::{ViewLifecycle, ViewProps};
pub use reducer::{scope_key, StateReducer, StateTree, SCOPE_PREFIX};
pub use route::{Next, Route};
pub use router::{EventRouter, RouterConfig, RouterError, RouterStats};
pub use view::{View, ViewHandlerTable, ViewRegistry};
