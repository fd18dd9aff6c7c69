//! Contracts for the cloud collaborators: compute inventory and DNS zones.
//!
//! The lifecycle logic only ever talks to these traits. Implementations are
//! expected to be single-shot: one remote call per method, no retries, no
//! caching beyond a single request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::error::DdnsError;
use crate::record::Change;

/// A key/value tag attached to a cloud resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Create a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Collapse a tag list into a map. Later duplicates win.
pub fn tag_map(tags: &[Tag]) -> HashMap<&str, &str> {
    tags.iter()
        .map(|t| (t.key.as_str(), t.value.as_str()))
        .collect()
}

/// A compute instance as reported by the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Provider instance identifier (e.g., "i-0abc123").
    pub instance_id: String,
    /// VPC the instance's primary interface lives in.
    pub vpc_id: String,
    /// Primary private IPv4 address.
    pub private_ip: Ipv4Addr,
    /// Public IPv4 address, if one was assigned.
    #[serde(default)]
    pub public_ip: Option<Ipv4Addr>,
    /// Instance tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A virtual network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpc {
    /// VPC identifier.
    pub vpc_id: String,
    /// VPC tags; the forward domain is read from one of them.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A subnet within a VPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Subnet identifier.
    pub subnet_id: String,
    /// Whether instances launched here get a public address automatically.
    #[serde(default)]
    pub map_public_ip_on_launch: bool,
}

/// A hosted zone as listed by the zone service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    /// Zone id, possibly in path form (`/hostedzone/<ID>`).
    pub id: String,
    /// Zone apex, trailing-dot qualified.
    pub name: String,
}

/// Compute inventory: instances, networks, and instance tags.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Fetch an instance by id.
    async fn get_instance(&self, instance_id: &str) -> Result<Instance, DdnsError>;

    /// Fetch a VPC by id.
    async fn get_vpc(&self, vpc_id: &str) -> Result<Vpc, DdnsError>;

    /// Fetch a subnet by id.
    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet, DdnsError>;

    /// Create or overwrite tags on an instance.
    async fn set_instance_tags(&self, instance_id: &str, tags: Vec<Tag>) -> Result<(), DdnsError>;
}

/// Authoritative DNS zones.
#[async_trait]
pub trait ZoneService: Send + Sync {
    /// List hosted zones in provider order, starting at the best match for `name`.
    async fn list_zones_by_name(&self, name: &str) -> Result<Vec<HostedZone>, DdnsError>;

    /// Submit a change batch to a zone. The batch is applied atomically.
    async fn submit_change_batch(&self, zone_id: &str, changes: Vec<Change>)
        -> Result<(), DdnsError>;
}
