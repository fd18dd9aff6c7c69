//! Inbound lifecycle events, validated at the boundary.
//!
//! The trigger delivers a JSON envelope with a `detail-type` discriminator and
//! a `detail` payload:
//!
//! ```json
//! {
//!   "detail-type": "EC2 Instance Launch Successful",
//!   "detail": {
//!     "EC2InstanceId": "i-0abc123",
//!     "AutoScalingGroupName": "web",
//!     "Details": { "Subnet ID": "subnet-1" }
//!   }
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::DdnsError;

/// `detail-type` of a successful instance launch.
pub const LAUNCH_DETAIL_TYPE: &str = "EC2 Instance Launch Successful";

/// `detail-type` of a successful instance termination.
pub const TERMINATION_DETAIL_TYPE: &str = "EC2 Instance Terminate Successful";

/// An instance was launched into an autoscaling group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEvent {
    /// Instance identifier.
    pub instance_id: String,
    /// Subnet the instance was launched into.
    pub subnet_id: String,
    /// Autoscaling group name, used as the hostname prefix.
    pub group_name: String,
}

/// An instance was terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationEvent {
    /// Instance identifier.
    pub instance_id: String,
}

/// A lifecycle event this system acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Create records.
    Launch(LaunchEvent),
    /// Remove records.
    Termination(TerminationEvent),
}

impl LifecycleEvent {
    /// Instance the event is about.
    pub fn instance_id(&self) -> &str {
        match self {
            LifecycleEvent::Launch(e) => &e.instance_id,
            LifecycleEvent::Termination(e) => &e.instance_id,
        }
    }
}

/// Result of classifying an inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A launch or termination.
    Lifecycle(LifecycleEvent),
    /// Any other `detail-type`; carried for logging only.
    Unrecognized(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "detail-type")]
    detail_type: String,
    #[serde(default)]
    detail: Value,
}

#[derive(Deserialize)]
struct LaunchDetail {
    #[serde(rename = "EC2InstanceId")]
    instance_id: String,
    #[serde(rename = "AutoScalingGroupName")]
    group_name: String,
    #[serde(rename = "Details")]
    details: LaunchDetails,
}

#[derive(Deserialize)]
struct LaunchDetails {
    #[serde(rename = "Subnet ID")]
    subnet_id: String,
}

#[derive(Deserialize)]
struct TerminationDetail {
    #[serde(rename = "EC2InstanceId")]
    instance_id: String,
}

/// Classify and validate an inbound envelope.
///
/// Only recognized events have their `detail` validated; anything else is
/// passed through as [`InboundEvent::Unrecognized`].
pub fn parse_event(raw: &Value) -> Result<InboundEvent, DdnsError> {
    let envelope = Envelope::deserialize(raw)
        .map_err(|e| DdnsError::Validation(format!("event envelope: {e}")))?;

    match envelope.detail_type.as_str() {
        LAUNCH_DETAIL_TYPE => {
            let detail = LaunchDetail::deserialize(&envelope.detail)
                .map_err(|e| DdnsError::Validation(format!("launch event detail: {e}")))?;
            let event = LaunchEvent {
                instance_id: non_empty("EC2InstanceId", detail.instance_id)?,
                subnet_id: non_empty("Details.Subnet ID", detail.details.subnet_id)?,
                group_name: non_empty("AutoScalingGroupName", detail.group_name)?,
            };
            Ok(InboundEvent::Lifecycle(LifecycleEvent::Launch(event)))
        }
        TERMINATION_DETAIL_TYPE => {
            let detail = TerminationDetail::deserialize(&envelope.detail)
                .map_err(|e| DdnsError::Validation(format!("termination event detail: {e}")))?;
            let event = TerminationEvent {
                instance_id: non_empty("EC2InstanceId", detail.instance_id)?,
            };
            Ok(InboundEvent::Lifecycle(LifecycleEvent::Termination(event)))
        }
        _ => Ok(InboundEvent::Unrecognized(envelope.detail_type)),
    }
}

fn non_empty(field: &str, value: String) -> Result<String, DdnsError> {
    if value.trim().is_empty() {
        return Err(DdnsError::Validation(format!("{field} is empty")));
    }
    Ok(value)
}
