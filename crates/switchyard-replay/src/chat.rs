//! Stock chat handlers.
//!
//! Network-level events (`nick`, `rooms`, `disconnect`) write directly under
//! their network; room-level events (`join`, `userlist`, `msg`) are named
//! and write under the room's scope. `ping` only routes: it answers through
//! the send sink and never touches state.

use anyhow::Result;
use serde_json::{json, Value};
use switchyard_core::{scope_key, Event, EventHandler, Switchyard};
use tracing::warn;

/// Messages kept per room.
pub const HISTORY_LIMIT: usize = 100;

/// Install every stock handler on `yard`.
///
/// # Errors
///
/// Returns an error if a handler cannot be registered.
pub fn install(yard: &Switchyard) -> Result<()> {
    let router = yard.router();

    router.set_event("nick", EventHandler::new(|event, _| field(event, "nick")))?;
    router.set_event("rooms", EventHandler::new(|event, _| field(event, "rooms")))?;
    router.set_event(
        "disconnect",
        EventHandler::new(|_, _| Some(json!("disconnected"))),
    )?;
    router.set_event("userlist", EventHandler::new(|event, _| field(event, "userlist")))?;
    router.set_event("join", EventHandler::new(join))?;
    router.set_event("msg", EventHandler::new(msg))?;

    let handle = router.clone();
    router.set_event(
        "ping",
        EventHandler::on_route(move |event, _, next| {
            let server = event.get("server").cloned().unwrap_or(Value::Null);
            if let Err(e) = handle.send(vec![json!("PONG"), server]) {
                warn!("Failed to answer ping: {}", e);
            }
            next.advance();
        }),
    )?;

    Ok(())
}

fn field(event: &Event, key: &str) -> Option<Value> {
    event.get(key).cloned()
}

/// The value this event type last wrote in the event's room.
fn previous(event: &Event, state: &Value, event_type: &str) -> Option<Value> {
    let name = event.name()?;
    state.get(scope_key(name))?.get(event_type).cloned()
}

/// Appends the joining user to the room's join list.
fn join(event: &Event, state: Value) -> Option<Value> {
    let user = event.get("user")?.clone();
    let mut joined = match previous(event, &state, "join") {
        Some(Value::Array(list)) => list,
        _ => Vec::new(),
    };
    joined.push(user);
    Some(Value::Array(joined))
}

/// Appends the message to the room's history, oldest first.
fn msg(event: &Event, state: Value) -> Option<Value> {
    event.name()?;
    let mut history = match previous(event, &state, "msg") {
        Some(Value::Array(list)) => list,
        _ => Vec::new(),
    };
    history.push(json!({
        "from": event.get("from").cloned().unwrap_or(Value::Null),
        "text": event.get("text").cloned().unwrap_or(Value::Null),
    }));
    if history.len() > HISTORY_LIMIT {
        history.drain(..history.len() - HISTORY_LIMIT);
    }
    Some(Value::Array(history))
}
