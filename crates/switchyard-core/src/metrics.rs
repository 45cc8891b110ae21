//! Dispatch instrumentation.
//!
//! Uses the `metrics` facade; nothing is exported unless the embedding
//! process installs a recorder.

use metrics::{counter, gauge};

/// Metric names.
pub mod names {
    pub const EVENTS_RECEIVED: &str = "switchyard_events_received_total";
    pub const EVENTS_DROPPED: &str = "switchyard_events_dropped_total";
    pub const ROUTES_COMPLETED: &str = "switchyard_routes_completed_total";
    pub const VIEWS_ACTIVE: &str = "switchyard_views_active";
    pub const OUTBOUND: &str = "switchyard_outbound_total";
}

/// Describe all metrics to the installed recorder.
pub fn describe() {
    metrics::describe_counter!(names::EVENTS_RECEIVED, "Events handed to the router");
    metrics::describe_counter!(
        names::EVENTS_DROPPED,
        "Events dropped before a route could be built"
    );
    metrics::describe_counter!(
        names::ROUTES_COMPLETED,
        "Routes whose last stage advanced and whose state fold ran"
    );
    metrics::describe_gauge!(names::VIEWS_ACTIVE, "Currently registered views");
    metrics::describe_counter!(names::OUTBOUND, "Messages passed to the send sink");
}

pub(crate) fn record_received() {
    counter!(names::EVENTS_RECEIVED).increment(1);
}

pub(crate) fn record_dropped(reason: &'static str) {
    counter!(names::EVENTS_DROPPED, "reason" => reason).increment(1);
}

pub(crate) fn record_completed() {
    counter!(names::ROUTES_COMPLETED).increment(1);
}

pub(crate) fn record_outbound() {
    counter!(names::OUTBOUND).increment(1);
}

pub(crate) fn set_active_views(count: usize) {
    gauge!(names::VIEWS_ACTIVE).set(count as f64);
}
