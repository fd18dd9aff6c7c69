//! Metrics instrumentation for instance-ddns.
//!
//! All metrics are prefixed with `instance_ddns.`

use metrics::{counter, histogram};
use std::time::Instant;

use crate::record::{ChangeAction, RecordType};

/// Lifecycle event kinds for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Instance launch.
    Launch,
    /// Instance termination.
    Termination,
    /// Event type this system does not handle.
    Ignored,
    /// Envelope without a `detail-type`.
    Invalid,
}

/// Record a routed lifecycle event and its outcome.
pub fn record_event(kind: EventKind, success: bool) {
    let kind_str = match kind {
        EventKind::Launch => "launch",
        EventKind::Termination => "termination",
        EventKind::Ignored => "ignored",
        EventKind::Invalid => "invalid",
    };
    let result_str = if success { "success" } else { "error" };

    counter!("instance_ddns.event.count", "kind" => kind_str, "result" => result_str)
        .increment(1);
}

/// Record a change batch submission against a zone.
pub fn record_change(
    action: ChangeAction,
    record_type: RecordType,
    success: bool,
    duration: std::time::Duration,
) {
    let result_str = if success { "success" } else { "error" };

    counter!(
        "instance_ddns.record.change.count",
        "action" => action.as_str(),
        "type" => record_type.as_str(),
        "result" => result_str
    )
    .increment(1);
    histogram!("instance_ddns.record.change.duration.seconds", "action" => action.as_str())
        .record(duration.as_secs_f64());
}

/// Record a hosted zone lookup.
pub fn record_zone_lookup(found: bool) {
    let result_str = if found { "found" } else { "not_found" };
    counter!("instance_ddns.zone.lookup.count", "result" => result_str).increment(1);
}

/// Record an annotation that was absent at termination time.
pub fn record_annotation_skipped(key: &'static str) {
    counter!("instance_ddns.annotation.skipped.count", "key" => key).increment(1);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
