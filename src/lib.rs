//! instance-ddns - Forward and reverse DNS for autoscaled instances.
//!
//! When an instance launches it gets a predictable hostname, an A record, and
//! a PTR record. When it terminates, those records are removed. The two events
//! arrive independently, so the records created at launch are written as tags
//! on the instance itself and read back at termination. There is no other
//! store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          instance-ddns                           │
//! │                                                                  │
//! │  event ──▶ EventRouter ──▶ LifecycleCorrelator                   │
//! │                                 │         │                      │
//! │                     NameDeriver │         │ ZoneResolver         │
//! │                                 ▼         ▼                      │
//! │                            RecordMutator ──────▶ ZoneService     │
//! │                                 │                                │
//! │                                 └─ tags ───────▶ Inventory       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Naming
//!
//! ```text
//! group "web", instance "i-0abc123", VPC Domain tag "prod.internal", 10.0.1.55
//!   A    web-0abc123.prod.internal.   -> 10.0.1.55   (zone prod.internal.)
//!   PTR  55.1.0.10.in-addr.arpa.      -> web-0abc123.prod.internal.
//!                                        (zone 1.0.10.in-addr.arpa.)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use instance_ddns::{DdnsConfig, EventRouter, LifecycleCorrelator, MemoryCloud};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cloud = MemoryCloud::new();
//!     let correlator = LifecycleCorrelator::new(
//!         Arc::new(cloud.clone()),
//!         Arc::new(cloud.clone()),
//!         DdnsConfig::default(),
//!     );
//!     let router = EventRouter::new(correlator);
//!
//!     let event = serde_json::json!({ "detail-type": "EC2 Instance Terminate Successful",
//!                                     "detail": { "EC2InstanceId": "i-0abc123" } });
//!     router.route(&event).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod memory;
pub mod metrics;
pub mod naming;
pub mod provider;
pub mod record;
pub mod router;
pub mod telemetry;
pub mod zone;

// Re-export main types
pub use config::{Config, DdnsConfig, TelemetryConfig};
pub use error::DdnsError;
pub use event::{InboundEvent, LaunchEvent, LifecycleEvent, TerminationEvent};
pub use lifecycle::{LifecycleCorrelator, ProvisionedRecords, RemovedRecords};
pub use memory::{CloudFixture, MemoryCloud};
pub use provider::{Inventory, ZoneService};
pub use record::{RecordMutationResult, RecordMutator, RecordType, ResourceRecordDescriptor};
pub use router::{shared_router, EventRouter, RouteOutcome};
pub use zone::{ZoneReference, ZoneResolver};
