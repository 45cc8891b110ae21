//! Route execution.
//!
//! A [`Route`] is the ordered list of stages built for one dispatch. Running
//! it is pure continuation passing: each stage receives a [`Next`] token and
//! nothing further happens until that token is consumed. Tokens are `Send`,
//! so a stage may hand its token to a timer or another task and advance
//! later. There is no timeout and no cancellation; a stage that drops its
//! token without advancing ends the route there, and the completion
//! callback never runs.

use crate::event::Event;
use crate::handler::{Handler, RouteFn};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

type Completion = Box<dyn FnOnce(Event) + Send>;

/// The stages for one dispatch: `[head, ...stages]`.
#[derive(Clone)]
pub struct Route {
    head: RouteFn,
    stages: Vec<Handler>,
}

impl Route {
    /// Start a route with its opening stage.
    pub fn new<F>(head: F) -> Self
    where
        F: Fn(Event, Value, Next) + Send + Sync + 'static,
    {
        Self::from_head(Arc::new(head))
    }

    /// Start a route from a shared opening stage.
    #[must_use]
    pub fn from_head(head: RouteFn) -> Self {
        Self {
            head,
            stages: Vec::new(),
        }
    }

    /// Append a stage.
    #[must_use]
    pub fn then(mut self, stage: Handler) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a stage in place.
    pub fn push(&mut self, stage: Handler) {
        self.stages.push(stage);
    }

    /// The opening stage.
    #[must_use]
    pub fn head(&self) -> &RouteFn {
        &self.head
    }

    /// Every stage after the opening one, in order.
    #[must_use]
    pub fn stages(&self) -> &[Handler] {
        &self.stages
    }

    /// Total number of stages, including the opening one.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.stages.len()
    }

    /// Always `false`: a route has at least its opening stage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Run the route, calling `on_complete` with the final event once the
    /// last stage advances.
    ///
    /// The opening stage gets an empty state object; later stages only get
    /// the event.
    pub fn run<F>(self, event: Event, on_complete: F)
    where
        F: FnOnce(Event) + Send + 'static,
    {
        let chain = Arc::new(Chain {
            stages: self.stages,
            on_complete: Mutex::new(Some(Box::new(on_complete))),
        });

        trace!(stages = chain.stages.len() + 1, "Running route");
        let next = Next {
            chain,
            position: 0,
            event: event.clone(),
        };
        (self.head)(event, Value::Object(Map::new()), next);
    }

    /// Run the route without a completion callback.
    pub fn run_detached(self, event: Event) {
        self.run(event, |_| {});
    }
}

impl Extend<Handler> for Route {
    fn extend<I: IntoIterator<Item = Handler>>(&mut self, iter: I) {
        self.stages.extend(iter);
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("len", &self.len()).finish()
    }
}

/// State private to one running route.
struct Chain {
    stages: Vec<Handler>,
    on_complete: Mutex<Option<Completion>>,
}

impl Chain {
    fn step(self: Arc<Self>, position: usize, event: Event) {
        match self.stages.get(position) {
            Some(stage) => {
                trace!(position = position + 1, "Advancing route");
                let stage = Arc::clone(stage);
                let next = Next {
                    chain: self,
                    position: position + 1,
                    event: event.clone(),
                };
                stage(event, next);
            }
            None => {
                let done = self.on_complete.lock().take();
                if let Some(done) = done {
                    trace!("Route complete");
                    done(event);
                }
            }
        }
    }
}

/// Single-shot continuation handed to each stage.
///
/// Consuming it runs the next stage (or completes the route). Dropping it
/// without advancing stalls the route for good.
pub struct Next {
    chain: Arc<Chain>,
    position: usize,
    event: Event,
}

impl Next {
    /// Continue with the event this stage received.
    pub fn advance(self) {
        let Self {
            chain,
            position,
            event,
        } = self;
        chain.step(position, event);
    }

    /// Continue with a replacement event.
    pub fn advance_with(self, event: Event) {
        self.chain.step(self.position, event);
    }

    /// The event this stage received.
    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Number of stages still to run after this one.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.stages.len().saturating_sub(self.position)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler;
    use serde_json::json;
    use std::time::Duration;

    fn count(event: &Event) -> i64 {
        event.get("count").and_then(Value::as_i64).unwrap_or(0)
    }

    #[test]
    fn test_route_runs_in_order_passing_events() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let finished = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        let route = Route::new(move |mut event, state, next| {
            assert_eq!(state, json!({}));
            o.lock().push(1);
            let c = count(&event);
            event.payload.insert("count".into(), json!(c + 1));
            next.advance_with(event);
        });

        let o = Arc::clone(&order);
        let route = route.then(handler(move |mut event, next| {
            assert_eq!(count(&event), 1);
            assert_eq!(event.get("z"), Some(&json!(2)));
            o.lock().push(2);
            event.payload.insert("count".into(), json!(2));
            event.payload.insert("x".into(), json!("new"));
            next.advance_with(event);
        }));

        let o = Arc::clone(&order);
        let route = route.then(handler(move |event, next| {
            assert_eq!(count(&event), 2);
            assert_eq!(event.get("x"), Some(&json!("new")));
            o.lock().push(3);
            next.advance();
        }));

        let o = Arc::clone(&order);
        let route = route.then(handler(move |_, next| {
            o.lock().push(4);
            next.advance();
        }));

        assert_eq!(route.len(), 4);

        let f = Arc::clone(&finished);
        route.run(
            Event::default().with_field("count", 0).with_field("z", 2),
            move |event| f.lock().push(event),
        );

        assert_eq!(*order.lock(), vec![1, 2, 3, 4]);
        let finished = finished.lock();
        assert_eq!(finished.len(), 1);
        assert_eq!(count(&finished[0]), 2);
        assert_eq!(finished[0].get("x"), Some(&json!("new")));
    }

    #[test]
    fn test_advance_without_event_keeps_previous() {
        let finished = Arc::new(Mutex::new(None));
        let f = Arc::clone(&finished);

        Route::new(|event, _, next| next.advance_with(event.with_field("tag", "head")))
            .then(handler(|_, next| next.advance()))
            .run(Event::new("x"), move |event| *f.lock() = Some(event));

        let event = finished.lock().take().unwrap();
        assert_eq!(event.get("tag"), Some(&json!("head")));
    }

    #[test]
    fn test_stalled_stage_never_completes() {
        let reached = Arc::new(Mutex::new(false));
        let finished = Arc::new(Mutex::new(false));

        let r = Arc::clone(&reached);
        let f = Arc::clone(&finished);
        Route::new(|_, _, _next| {})
            .then(handler(move |_, next| {
                *r.lock() = true;
                next.advance();
            }))
            .run(Event::new("x"), move |_| *f.lock() = true);

        assert!(!*reached.lock());
        assert!(!*finished.lock());
    }

    #[test]
    fn test_next_remaining() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s1 = Arc::clone(&seen);
        let s2 = Arc::clone(&seen);

        Route::new(move |_, _, next| {
            s1.lock().push(next.remaining());
            next.advance();
        })
        .then(handler(move |_, next| {
            s2.lock().push(next.remaining());
            next.advance();
        }))
        .run_detached(Event::new("x"));

        assert_eq!(*seen.lock(), vec![1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_supports_async_stages() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let o1 = Arc::clone(&order);
        let o2 = Arc::clone(&order);
        let o3 = Arc::clone(&order);

        Route::new(move |_, _, next| {
            o1.lock().push("head");
            next.advance();
        })
        .then(handler(move |_, next| {
            o2.lock().push("timer");
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                next.advance();
            });
        }))
        .then(handler(move |_, next| {
            o3.lock().push("done");
            next.advance();
        }))
        .run(Event::new("x"), move |_| {
            let _ = done_tx.send(());
        });

        assert_eq!(*order.lock(), vec!["head", "timer"]);
        done_rx.await.unwrap();
        assert_eq!(*order.lock(), vec!["head", "timer", "done"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interleaved_routes_keep_their_own_position() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        for (id, delay) in [("slow", 30u64), ("fast", 5u64)] {
            let l1 = Arc::clone(&log);
            let l2 = Arc::clone(&log);
            let tx = tx.clone();
            Route::new(move |_, _, next| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    next.advance();
                });
            })
            .then(handler(move |event, next| {
                l1.lock().push(format!("{}:1", event.event_type().unwrap_or_default()));
                next.advance();
            }))
            .then(handler(move |event, next| {
                l2.lock().push(format!("{}:2", event.event_type().unwrap_or_default()));
                next.advance();
            }))
            .run(Event::new(id), move |event| {
                let _ = tx.send(event.event.unwrap_or_default());
            });
        }

        assert_eq!(rx.recv().await.unwrap(), "fast");
        assert_eq!(rx.recv().await.unwrap(), "slow");
        assert_eq!(
            *log.lock(),
            vec!["fast:1", "fast:2", "slow:1", "slow:2"]
        );
    }
}
