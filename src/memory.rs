//! In-process cloud implementing both collaborator contracts.
//!
//! Used by the replay binary and the test suites. Zone listing order, change
//! batch atomicity, and exact-match deletes follow the real provider.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::DdnsError;
use crate::provider::{HostedZone, Instance, Inventory, Subnet, Tag, Vpc, ZoneService};
use crate::record::{Change, ChangeAction, RecordType, ResourceRecordSet};
use crate::zone::bare_zone_id;

/// One call made against the cloud, in order of arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CloudCall {
    /// `Inventory::get_instance`
    GetInstance(String),
    /// `Inventory::get_vpc`
    GetVpc(String),
    /// `Inventory::get_subnet`
    GetSubnet(String),
    /// `Inventory::set_instance_tags`
    SetInstanceTags {
        /// Target instance.
        instance_id: String,
        /// Tags written.
        tags: Vec<Tag>,
    },
    /// `ZoneService::list_zones_by_name`
    ListZonesByName(String),
    /// `ZoneService::submit_change_batch`
    SubmitChangeBatch {
        /// Target zone.
        zone_id: String,
        /// Submitted changes.
        changes: Vec<Change>,
    },
}

/// Initial cloud contents, as loaded from a JSON fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudFixture {
    /// Instances.
    #[serde(default)]
    pub instances: Vec<Instance>,
    /// VPCs.
    #[serde(default)]
    pub vpcs: Vec<Vpc>,
    /// Subnets.
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    /// Hosted zones.
    #[serde(default)]
    pub zones: Vec<HostedZone>,
}

/// Point-in-time view of records and instance tags.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CloudSnapshot {
    /// bare zone id -> record sets, sorted by name and type
    pub zones: BTreeMap<String, Vec<ResourceRecordSet>>,
    /// instance id -> tags
    pub instance_tags: BTreeMap<String, Vec<Tag>>,
}

type ZoneRecords = BTreeMap<(String, RecordType), ResourceRecordSet>;

/// Thread-safe in-memory cloud. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCloud {
    inner: Arc<RwLock<MemoryCloudInner>>,
}

#[derive(Debug, Default)]
struct MemoryCloudInner {
    instances: HashMap<String, Instance>,
    vpcs: HashMap<String, Vpc>,
    subnets: HashMap<String, Subnet>,

    /// Hosted zones in insertion order.
    zones: Vec<HostedZone>,

    /// bare zone id -> records
    records: HashMap<String, ZoneRecords>,

    /// Zones whose change batches fail with a remote error.
    failing_zones: HashSet<String>,

    calls: Vec<CloudCall>,
}

impl MemoryCloud {
    /// Create an empty cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON fixture file and seed a cloud from it.
    pub async fn load_fixture(path: &Path) -> Result<Self, DdnsError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let fixture: CloudFixture = serde_json::from_str(&raw)?;
        Ok(Self::from_fixture(fixture))
    }

    /// Create a cloud seeded from a fixture.
    pub fn from_fixture(fixture: CloudFixture) -> Self {
        let cloud = Self::new();
        for instance in fixture.instances {
            cloud.add_instance(instance);
        }
        for vpc in fixture.vpcs {
            cloud.add_vpc(vpc);
        }
        for subnet in fixture.subnets {
            cloud.add_subnet(subnet);
        }
        for zone in fixture.zones {
            cloud.add_zone(zone);
        }
        cloud
    }

    /// Insert or replace an instance.
    pub fn add_instance(&self, instance: Instance) {
        let mut inner = self.inner.write();
        inner
            .instances
            .insert(instance.instance_id.clone(), instance);
    }

    /// Remove an instance, as the provider does once it is terminated.
    pub fn remove_instance(&self, instance_id: &str) {
        self.inner.write().instances.remove(instance_id);
    }

    /// Insert or replace a VPC.
    pub fn add_vpc(&self, vpc: Vpc) {
        let mut inner = self.inner.write();
        inner.vpcs.insert(vpc.vpc_id.clone(), vpc);
    }

    /// Insert or replace a subnet.
    pub fn add_subnet(&self, subnet: Subnet) {
        let mut inner = self.inner.write();
        inner.subnets.insert(subnet.subnet_id.clone(), subnet);
    }

    /// Add a hosted zone. Zones sharing a name are kept in insertion order.
    pub fn add_zone(&self, zone: HostedZone) {
        let mut inner = self.inner.write();
        inner
            .records
            .entry(bare_zone_id(&zone.id).to_string())
            .or_default();
        inner.zones.push(zone);
    }

    /// Make every change batch against `zone_id` fail with a remote error.
    pub fn fail_changes_for(&self, zone_id: &str) {
        self.inner.write().failing_zones.insert(zone_id.to_string());
    }

    /// Put a record set straight into a zone, bypassing the call log.
    pub fn put_record_set(&self, zone_id: &str, record_set: ResourceRecordSet) {
        let mut inner = self.inner.write();
        inner
            .records
            .entry(zone_id.to_string())
            .or_default()
            .insert(record_key(&record_set), record_set);
    }

    /// Look up one record set.
    pub fn record_set(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Option<ResourceRecordSet> {
        let inner = self.inner.read();
        inner
            .records
            .get(zone_id)?
            .get(&(name.to_ascii_lowercase(), record_type))
            .cloned()
    }

    /// All record sets in a zone.
    pub fn record_sets(&self, zone_id: &str) -> Vec<ResourceRecordSet> {
        let inner = self.inner.read();
        inner
            .records
            .get(zone_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Current tags on an instance, if it exists.
    pub fn instance_tags(&self, instance_id: &str) -> Option<Vec<Tag>> {
        let inner = self.inner.read();
        inner.instances.get(instance_id).map(|i| i.tags.clone())
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<CloudCall> {
        self.inner.read().calls.clone()
    }

    /// Change batches submitted so far, as `(zone_id, change)` pairs.
    pub fn changes(&self) -> Vec<(String, Change)> {
        let inner = self.inner.read();
        inner
            .calls
            .iter()
            .filter_map(|call| match call {
                CloudCall::SubmitChangeBatch { zone_id, changes } => Some(
                    changes
                        .iter()
                        .map(|c| (zone_id.clone(), c.clone()))
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.inner.write().calls.clear();
    }

    /// Snapshot of all records and instance tags.
    pub fn snapshot(&self) -> CloudSnapshot {
        let inner = self.inner.read();
        CloudSnapshot {
            zones: inner
                .records
                .iter()
                .map(|(id, records)| (id.clone(), records.values().cloned().collect()))
                .collect(),
            instance_tags: inner
                .instances
                .values()
                .map(|i| (i.instance_id.clone(), i.tags.clone()))
                .collect(),
        }
    }

    fn record_call(&self, call: CloudCall) {
        self.inner.write().calls.push(call);
    }
}

fn record_key(record_set: &ResourceRecordSet) -> (String, RecordType) {
    (record_set.name.to_ascii_lowercase(), record_set.record_type)
}

/// Names compare case-insensitively; type, values, and TTL exactly.
fn same_record_set(a: &ResourceRecordSet, b: &ResourceRecordSet) -> bool {
    a.name.eq_ignore_ascii_case(&b.name)
        && a.record_type == b.record_type
        && a.records == b.records
        && a.ttl == b.ttl
}

/// Sort key giving the provider's listing order: labels compared from the root.
fn zone_order_key(name: &str) -> Vec<String> {
    name.trim_end_matches('.')
        .split('.')
        .rev()
        .map(str::to_ascii_lowercase)
        .collect()
}

fn within_zone(name: &str, zone_name: &str) -> bool {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    let zone = zone_name.trim_end_matches('.').to_ascii_lowercase();
    name == zone || name.ends_with(&format!(".{zone}"))
}

fn apply_change(
    records: &mut ZoneRecords,
    zone_name: &str,
    change: &Change,
) -> Result<(), DdnsError> {
    let record_set = &change.record_set;
    if !within_zone(&record_set.name, zone_name) {
        return Err(DdnsError::Validation(format!(
            "{} is not within zone {zone_name}",
            record_set.name
        )));
    }

    let key = record_key(record_set);
    match change.action {
        ChangeAction::Upsert => {
            records.insert(key, record_set.clone());
        }
        ChangeAction::Delete => match records.get(&key) {
            Some(existing) if same_record_set(existing, record_set) => {
                records.remove(&key);
            }
            _ => {
                return Err(DdnsError::NotFound(format!(
                    "{} record set {} with the given values",
                    record_set.record_type, record_set.name
                )))
            }
        },
    }
    Ok(())
}

#[async_trait]
impl Inventory for MemoryCloud {
    async fn get_instance(&self, instance_id: &str) -> Result<Instance, DdnsError> {
        self.record_call(CloudCall::GetInstance(instance_id.to_string()));
        let inner = self.inner.read();
        inner
            .instances
            .get(instance_id)
            .cloned()
            .ok_or_else(|| DdnsError::NotFound(format!("instance {instance_id}")))
    }

    async fn get_vpc(&self, vpc_id: &str) -> Result<Vpc, DdnsError> {
        self.record_call(CloudCall::GetVpc(vpc_id.to_string()));
        let inner = self.inner.read();
        inner
            .vpcs
            .get(vpc_id)
            .cloned()
            .ok_or_else(|| DdnsError::NotFound(format!("vpc {vpc_id}")))
    }

    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet, DdnsError> {
        self.record_call(CloudCall::GetSubnet(subnet_id.to_string()));
        let inner = self.inner.read();
        inner
            .subnets
            .get(subnet_id)
            .cloned()
            .ok_or_else(|| DdnsError::NotFound(format!("subnet {subnet_id}")))
    }

    async fn set_instance_tags(&self, instance_id: &str, tags: Vec<Tag>) -> Result<(), DdnsError> {
        self.record_call(CloudCall::SetInstanceTags {
            instance_id: instance_id.to_string(),
            tags: tags.clone(),
        });

        let mut inner = self.inner.write();
        let instance = inner
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| DdnsError::NotFound(format!("instance {instance_id}")))?;

        for tag in tags {
            match instance.tags.iter_mut().find(|t| t.key == tag.key) {
                Some(existing) => existing.value = tag.value,
                None => instance.tags.push(tag),
            }
        }
        debug!(instance_id, tags = instance.tags.len(), "instance tags updated");
        Ok(())
    }
}

#[async_trait]
impl ZoneService for MemoryCloud {
    async fn list_zones_by_name(&self, name: &str) -> Result<Vec<HostedZone>, DdnsError> {
        self.record_call(CloudCall::ListZonesByName(name.to_string()));

        let start = zone_order_key(name);
        let inner = self.inner.read();
        let mut zones: Vec<HostedZone> = inner
            .zones
            .iter()
            .filter(|z| zone_order_key(&z.name) >= start)
            .cloned()
            .collect();
        zones.sort_by_key(|z| zone_order_key(&z.name));
        Ok(zones)
    }

    async fn submit_change_batch(
        &self,
        zone_id: &str,
        changes: Vec<Change>,
    ) -> Result<(), DdnsError> {
        self.record_call(CloudCall::SubmitChangeBatch {
            zone_id: zone_id.to_string(),
            changes: changes.clone(),
        });

        let mut inner = self.inner.write();
        if inner.failing_zones.contains(zone_id) {
            return Err(DdnsError::remote("zone", format!("zone {zone_id} is unavailable")));
        }

        let zone_name = inner
            .zones
            .iter()
            .find(|z| bare_zone_id(&z.id) == zone_id)
            .map(|z| z.name.clone())
            .ok_or_else(|| DdnsError::NotFound(format!("hosted zone {zone_id}")))?;

        // Apply to a copy so a failing change leaves the zone untouched.
        let mut staged = inner.records.get(zone_id).cloned().unwrap_or_default();
        for change in &changes {
            apply_change(&mut staged, &zone_name, change)?;
        }
        inner.records.insert(zone_id.to_string(), staged);

        debug!(zone_id, changes = changes.len(), "change batch applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ResourceRecord;

    fn zone(id: &str, name: &str) -> HostedZone {
        HostedZone {
            id: format!("/hostedzone/{id}"),
            name: name.to_string(),
        }
    }

    fn a_record(name: &str, value: &str) -> ResourceRecordSet {
        ResourceRecordSet {
            record_type: RecordType::A,
            name: name.to_string(),
            records: vec![ResourceRecord {
                value: value.to_string(),
            }],
            ttl: 300,
        }
    }

    fn change(action: ChangeAction, record_set: ResourceRecordSet) -> Change {
        Change { action, record_set }
    }

    #[tokio::test]
    async fn test_list_zones_starts_at_name() {
        let cloud = MemoryCloud::new();
        cloud.add_zone(zone("Z3", "b.example."));
        cloud.add_zone(zone("Z1", "a.example."));
        cloud.add_zone(zone("Z2", "example."));

        let zones = cloud.list_zones_by_name("a.example.").await.unwrap();
        let ids: Vec<&str> = zones.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, vec!["/hostedzone/Z1", "/hostedzone/Z3"]);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let cloud = MemoryCloud::new();
        cloud.add_zone(zone("Z1", "example."));

        let first = change(ChangeAction::Upsert, a_record("www.example.", "10.0.0.1"));
        let second = change(ChangeAction::Upsert, a_record("www.example.", "10.0.0.2"));
        cloud.submit_change_batch("Z1", vec![first]).await.unwrap();
        cloud.submit_change_batch("Z1", vec![second]).await.unwrap();

        let records = cloud.record_sets("Z1");
        assert_eq!(records, vec![a_record("www.example.", "10.0.0.2")]);
    }

    #[tokio::test]
    async fn test_delete_requires_exact_match() {
        let cloud = MemoryCloud::new();
        cloud.add_zone(zone("Z1", "example."));
        cloud.put_record_set("Z1", a_record("www.example.", "10.0.0.1"));

        let wrong = change(ChangeAction::Delete, a_record("www.example.", "10.0.0.9"));
        let err = cloud.submit_change_batch("Z1", vec![wrong]).await.unwrap_err();
        assert!(matches!(err, DdnsError::NotFound(_)));
        assert_eq!(cloud.record_sets("Z1").len(), 1);

        let right = change(ChangeAction::Delete, a_record("www.example.", "10.0.0.1"));
        cloud.submit_change_batch("Z1", vec![right]).await.unwrap();
        assert!(cloud.record_sets("Z1").is_empty());
    }

    #[tokio::test]
    async fn test_delete_ignores_name_case() {
        let cloud = MemoryCloud::new();
        cloud.add_zone(zone("Z1", "example."));
        cloud.put_record_set("Z1", a_record("www.example.", "10.0.0.1"));

        let shouted = change(ChangeAction::Delete, a_record("WWW.Example.", "10.0.0.1"));
        cloud.submit_change_batch("Z1", vec![shouted]).await.unwrap();
        assert!(cloud.record_sets("Z1").is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_fixture_is_io_error() {
        let path = std::env::temp_dir().join("instance-ddns-absent-fixture.json");
        let err = MemoryCloud::load_fixture(&path).await.unwrap_err();
        assert!(matches!(err, DdnsError::Io(_)));
        assert_eq!(err.kind(), "io");
    }

    #[tokio::test]
    async fn test_failed_batch_is_not_applied() {
        let cloud = MemoryCloud::new();
        cloud.add_zone(zone("Z1", "example."));

        let batch = vec![
            change(ChangeAction::Upsert, a_record("a.example.", "10.0.0.1")),
            change(ChangeAction::Delete, a_record("missing.example.", "10.0.0.2")),
        ];
        assert!(cloud.submit_change_batch("Z1", batch).await.is_err());
        assert!(cloud.record_sets("Z1").is_empty());
    }

    #[tokio::test]
    async fn test_record_outside_zone_is_rejected() {
        let cloud = MemoryCloud::new();
        cloud.add_zone(zone("Z1", "example."));

        let batch = vec![change(ChangeAction::Upsert, a_record("www.other.", "10.0.0.1"))];
        let err = cloud.submit_change_batch("Z1", batch).await.unwrap_err();
        assert!(matches!(err, DdnsError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_zone_is_not_found() {
        let cloud = MemoryCloud::new();
        let batch = vec![change(ChangeAction::Upsert, a_record("www.example.", "10.0.0.1"))];
        let err = cloud.submit_change_batch("Z404", batch).await.unwrap_err();
        assert!(matches!(err, DdnsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_set_instance_tags_merges() {
        let cloud = MemoryCloud::new();
        cloud.add_instance(Instance {
            instance_id: "i-1".to_string(),
            vpc_id: "vpc-1".to_string(),
            private_ip: "10.0.0.1".parse().unwrap(),
            public_ip: None,
            tags: vec![Tag::new("Name", "old"), Tag::new("team", "infra")],
        });

        cloud
            .set_instance_tags("i-1", vec![Tag::new("Name", "new")])
            .await
            .unwrap();

        let tags = cloud.instance_tags("i-1").unwrap();
        assert_eq!(tags, vec![Tag::new("Name", "new"), Tag::new("team", "infra")]);
    }

    #[test]
    fn test_fixture_deserializes() {
        let fixture: CloudFixture = serde_json::from_str(
            r#"{
                "instances": [{"instance_id": "i-1", "vpc_id": "vpc-1", "private_ip": "10.0.0.1"}],
                "vpcs": [{"vpc_id": "vpc-1", "tags": [{"key": "Domain", "value": "example"}]}],
                "zones": [{"id": "/hostedzone/Z1", "name": "example."}]
            }"#,
        )
        .unwrap();
        let cloud = MemoryCloud::from_fixture(fixture);
        assert!(cloud.instance_tags("i-1").is_some());
        assert!(cloud.snapshot().zones.contains_key("Z1"));
    }
}
