//! Resource record sets, the descriptors persisted on instances, and the
//! mutator that creates and removes them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::DdnsError;
use crate::metrics::{self, Timer};
use crate::provider::ZoneService;

/// Default TTL for managed records, in seconds.
pub const DEFAULT_TTL: u32 = 300;

/// Record types managed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    /// Forward IPv4 address record.
    A,
    /// Reverse pointer record.
    #[serde(rename = "PTR")]
    Ptr,
}

impl RecordType {
    /// Wire name of the record type.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Ptr => "PTR",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action carried by a single change in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    /// Insert the record set or replace it if it exists.
    Upsert,
    /// Remove the record set; it must match exactly.
    Delete,
}

impl ChangeAction {
    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Upsert => "UPSERT",
            ChangeAction::Delete => "DELETE",
        }
    }
}

/// One value of a record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Record data in presentation format.
    #[serde(rename = "Value")]
    pub value: String,
}

/// A named, typed set of records as the zone service sees it.
///
/// Field names follow the provider's JSON shape so persisted annotations stay
/// compatible with tags written by earlier deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    /// Record type.
    #[serde(rename = "Type")]
    pub record_type: RecordType,
    /// Owner name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Record values.
    #[serde(rename = "ResourceRecords")]
    pub records: Vec<ResourceRecord>,
    /// Time to live in seconds.
    #[serde(rename = "TTL")]
    pub ttl: u32,
}

/// A single change in a change batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What to do with the record set.
    pub action: ChangeAction,
    /// The record set the change applies to.
    pub record_set: ResourceRecordSet,
}

/// Exactly one authoritative record this crate created.
///
/// `name` is always trailing-dot qualified and lives in the zone `zone_id`.
/// The descriptor carries everything needed to build a matching delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AnnotationWire", into = "AnnotationWire")]
pub struct ResourceRecordDescriptor {
    /// Hosted zone id (bare, without any path prefix).
    pub zone_id: String,
    /// Record type.
    pub record_type: RecordType,
    /// Owner name, trailing-dot qualified.
    pub name: String,
    /// Single record value.
    pub value: String,
    /// Time to live in seconds.
    pub ttl: u32,
}

impl ResourceRecordDescriptor {
    /// The record set this descriptor stands for.
    pub fn to_record_set(&self) -> ResourceRecordSet {
        ResourceRecordSet {
            record_type: self.record_type,
            name: self.name.clone(),
            records: vec![ResourceRecord {
                value: self.value.clone(),
            }],
            ttl: self.ttl,
        }
    }

    /// Serialize to the compact JSON stored in an instance annotation.
    pub fn to_annotation(&self) -> Result<String, DdnsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a descriptor back out of an instance annotation.
    pub fn from_annotation(value: &str) -> Result<Self, DdnsError> {
        Ok(serde_json::from_str(value)?)
    }
}

/// Persisted shape of a descriptor.
#[derive(Serialize, Deserialize)]
struct AnnotationWire {
    #[serde(rename = "HostedZoneId")]
    zone_id: String,
    #[serde(rename = "ResourceRecordSet")]
    record_set: ResourceRecordSet,
}

impl TryFrom<AnnotationWire> for ResourceRecordDescriptor {
    type Error = String;

    fn try_from(wire: AnnotationWire) -> Result<Self, Self::Error> {
        let AnnotationWire {
            zone_id,
            record_set,
        } = wire;

        let mut records = record_set.records.into_iter();
        let value = match (records.next(), records.next()) {
            (Some(record), None) => record.value,
            _ => {
                return Err(format!(
                    "record set {} must carry exactly one value",
                    record_set.name
                ))
            }
        };

        // Older annotations may hold names without the trailing dot.
        let mut name = record_set.name;
        if !name.ends_with('.') {
            name.push('.');
        }

        Ok(Self {
            zone_id,
            record_type: record_set.record_type,
            name,
            value,
            ttl: record_set.ttl,
        })
    }
}

impl From<ResourceRecordDescriptor> for AnnotationWire {
    fn from(descriptor: ResourceRecordDescriptor) -> Self {
        let record_set = descriptor.to_record_set();
        Self {
            zone_id: descriptor.zone_id,
            record_set,
        }
    }
}

/// Result of a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMutationResult {
    /// The record now present in the zone.
    pub descriptor: ResourceRecordDescriptor,
}

/// Creates, replaces, and removes single record sets.
///
/// Each call submits exactly one change batch; failures are returned as-is.
#[derive(Clone)]
pub struct RecordMutator {
    zones: Arc<dyn ZoneService>,
}

impl RecordMutator {
    /// Create a mutator over the given zone service.
    pub fn new(zones: Arc<dyn ZoneService>) -> Self {
        Self { zones }
    }

    /// Insert or replace a single-valued record set.
    ///
    /// Repeating the call with the same arguments leaves the zone unchanged
    /// and returns an equal descriptor.
    pub async fn upsert(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
        value: &str,
        ttl: u32,
    ) -> Result<RecordMutationResult, DdnsError> {
        if !name.ends_with('.') {
            return Err(DdnsError::Validation(format!(
                "record name {name} is not fully qualified"
            )));
        }

        let descriptor = ResourceRecordDescriptor {
            zone_id: zone_id.to_string(),
            record_type,
            name: name.to_string(),
            value: value.to_string(),
            ttl,
        };

        info!(
            zone_id,
            record_type = %record_type,
            record_name = name,
            value,
            "submitting UPSERT"
        );

        self.submit(ChangeAction::Upsert, &descriptor).await?;

        info!(zone_id, record_type = %record_type, record_name = name, "UPSERT applied");

        Ok(RecordMutationResult { descriptor })
    }

    /// Remove the record set described by `descriptor`.
    ///
    /// Fails with [`DdnsError::NotFound`] when the zone no longer holds an
    /// exactly matching record set.
    pub async fn delete(&self, descriptor: &ResourceRecordDescriptor) -> Result<(), DdnsError> {
        info!(
            zone_id = %descriptor.zone_id,
            record_type = %descriptor.record_type,
            record_name = %descriptor.name,
            value = %descriptor.value,
            "submitting DELETE"
        );

        self.submit(ChangeAction::Delete, descriptor).await?;

        info!(
            zone_id = %descriptor.zone_id,
            record_type = %descriptor.record_type,
            record_name = %descriptor.name,
            "DELETE applied"
        );

        Ok(())
    }

    async fn submit(
        &self,
        action: ChangeAction,
        descriptor: &ResourceRecordDescriptor,
    ) -> Result<(), DdnsError> {
        let timer = Timer::start();
        let change = Change {
            action,
            record_set: descriptor.to_record_set(),
        };

        let result = self
            .zones
            .submit_change_batch(&descriptor.zone_id, vec![change])
            .await;

        metrics::record_change(
            action,
            descriptor.record_type,
            result.is_ok(),
            timer.elapsed(),
        );
        if let Err(ref e) = result {
            debug!(action = action.as_str(), error = %e, "change batch rejected");
        }
        result
    }
}
