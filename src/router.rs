//! Event dispatch.

use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::error::DdnsError;
use crate::event::{
    parse_event, InboundEvent, LifecycleEvent, LAUNCH_DETAIL_TYPE, TERMINATION_DETAIL_TYPE,
};
use crate::lifecycle::{LifecycleCorrelator, ProvisionedRecords, RemovedRecords};
use crate::metrics::{self, EventKind};

static SHARED_ROUTER: OnceLock<EventRouter> = OnceLock::new();

/// Process-wide router, built on first use.
///
/// The collaborator clients inside are stateless apart from connection
/// pooling, so one instance serves every event for the life of the process.
pub fn shared_router(init: impl FnOnce() -> EventRouter) -> &'static EventRouter {
    SHARED_ROUTER.get_or_init(init)
}

/// What routing an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Launch handled; records created and tagged.
    Provisioned(ProvisionedRecords),
    /// Termination handled.
    Removed(RemovedRecords),
    /// Event type not handled; nothing was called.
    Ignored {
        /// The unrecognized `detail-type`.
        detail_type: String,
    },
}

/// Dispatches inbound events to the lifecycle correlator.
#[derive(Clone)]
pub struct EventRouter {
    correlator: LifecycleCorrelator,
}

impl EventRouter {
    /// Create a router over a correlator.
    pub fn new(correlator: LifecycleCorrelator) -> Self {
        Self { correlator }
    }

    /// Validate and dispatch a raw event envelope.
    pub async fn route(&self, raw: &Value) -> Result<RouteOutcome, DdnsError> {
        debug!(event = %raw, "received event");

        let inbound = match parse_event(raw) {
            Ok(inbound) => inbound,
            Err(e) => {
                debug!(error = %e, "rejecting event");
                metrics::record_event(envelope_kind(raw), false);
                return Err(e);
            }
        };

        match inbound {
            InboundEvent::Lifecycle(event) => self.route_event(&event).await,
            InboundEvent::Unrecognized(detail_type) => {
                debug!(detail_type = %detail_type, "ignoring event");
                metrics::record_event(EventKind::Ignored, true);
                Ok(RouteOutcome::Ignored { detail_type })
            }
        }
    }

    /// Dispatch an already validated lifecycle event.
    pub async fn route_event(&self, event: &LifecycleEvent) -> Result<RouteOutcome, DdnsError> {
        info!(instance_id = %event.instance_id(), "handling lifecycle event");

        match event {
            LifecycleEvent::Launch(launch) => {
                let result = self.correlator.on_launch(launch).await;
                metrics::record_event(EventKind::Launch, result.is_ok());
                result.map(RouteOutcome::Provisioned)
            }
            LifecycleEvent::Termination(termination) => {
                let result = self.correlator.on_termination(termination).await;
                metrics::record_event(EventKind::Termination, result.is_ok());
                result.map(RouteOutcome::Removed)
            }
        }
    }
}

/// Metrics kind for an envelope that failed validation.
fn envelope_kind(raw: &Value) -> EventKind {
    match raw.get("detail-type").and_then(Value::as_str) {
        Some(LAUNCH_DETAIL_TYPE) => EventKind::Launch,
        Some(TERMINATION_DETAIL_TYPE) => EventKind::Termination,
        Some(_) => EventKind::Ignored,
        None => EventKind::Invalid,
    }
}
