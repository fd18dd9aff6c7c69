//! Shared test infrastructure for lifecycle integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};

use instance_ddns::config::DdnsConfig;
use instance_ddns::event::{LAUNCH_DETAIL_TYPE, TERMINATION_DETAIL_TYPE};
use instance_ddns::memory::{CloudCall, MemoryCloud};
use instance_ddns::provider::{HostedZone, Instance, Subnet, Tag, Vpc};
use instance_ddns::record::{Change, ChangeAction};
use instance_ddns::{EventRouter, LifecycleCorrelator};

// --- Constants ---

pub const INSTANCE_ID: &str = "i-0abc123";
pub const GROUP: &str = "web";
pub const DOMAIN: &str = "prod.internal";
pub const VPC_ID: &str = "vpc-0001";
pub const PRIVATE_SUBNET: &str = "subnet-private";
pub const PUBLIC_SUBNET: &str = "subnet-public";
pub const PRIVATE_IP: &str = "10.0.1.55";
pub const PUBLIC_IP: &str = "54.12.0.7";
pub const FORWARD_ZONE_ID: &str = "ZFWD0001";
pub const REVERSE_ZONE_ID: &str = "ZREV0001";

pub const HOSTNAME: &str = "web-0abc123.prod.internal.";
pub const PTR_NAME: &str = "55.1.0.10.in-addr.arpa.";

// --- Cloud builder ---

pub struct TestCloudBuilder {
    cloud: MemoryCloud,
}

impl TestCloudBuilder {
    /// A VPC tagged with `DOMAIN`, one private and one public subnet, and
    /// the forward and /24 reverse zones for `PRIVATE_IP`.
    pub fn new() -> Self {
        let cloud = MemoryCloud::new();
        cloud.add_vpc(Vpc {
            vpc_id: VPC_ID.to_string(),
            tags: vec![Tag::new("Domain", DOMAIN), Tag::new("env", "prod")],
        });
        cloud.add_subnet(Subnet {
            subnet_id: PRIVATE_SUBNET.to_string(),
            map_public_ip_on_launch: false,
        });
        cloud.add_subnet(Subnet {
            subnet_id: PUBLIC_SUBNET.to_string(),
            map_public_ip_on_launch: true,
        });
        cloud.add_zone(HostedZone {
            id: format!("/hostedzone/{FORWARD_ZONE_ID}"),
            name: format!("{DOMAIN}."),
        });
        cloud.add_zone(HostedZone {
            id: format!("/hostedzone/{REVERSE_ZONE_ID}"),
            name: "1.0.10.in-addr.arpa.".to_string(),
        });
        Self { cloud }
    }

    /// Add an instance in `VPC_ID`.
    pub fn instance(self, instance_id: &str, private_ip: &str, public_ip: Option<&str>) -> Self {
        self.cloud.add_instance(Instance {
            instance_id: instance_id.to_string(),
            vpc_id: VPC_ID.to_string(),
            private_ip: private_ip.parse().unwrap(),
            public_ip: public_ip.map(|ip| ip.parse().unwrap()),
            tags: vec![],
        });
        self
    }

    /// Add the default scenario instance.
    pub fn default_instance(self) -> Self {
        self.instance(INSTANCE_ID, PRIVATE_IP, Some(PUBLIC_IP))
    }

    /// Add another hosted zone.
    pub fn zone(self, id: &str, name: &str) -> Self {
        self.cloud.add_zone(HostedZone {
            id: format!("/hostedzone/{id}"),
            name: name.to_string(),
        });
        self
    }

    pub fn build(self) -> MemoryCloud {
        self.cloud
    }
}

pub fn build_router(cloud: &MemoryCloud) -> EventRouter {
    build_router_with_config(cloud, DdnsConfig::default())
}

pub fn build_router_with_config(cloud: &MemoryCloud, config: DdnsConfig) -> EventRouter {
    EventRouter::new(LifecycleCorrelator::new(
        Arc::new(cloud.clone()),
        Arc::new(cloud.clone()),
        config,
    ))
}

// --- Events ---

pub fn launch_event(instance_id: &str, group: &str, subnet_id: &str) -> Value {
    json!({
        "version": "0",
        "source": "aws.autoscaling",
        "detail-type": LAUNCH_DETAIL_TYPE,
        "detail": {
            "EC2InstanceId": instance_id,
            "AutoScalingGroupName": group,
            "Details": {
                "Availability Zone": "us-east-1a",
                "Subnet ID": subnet_id
            }
        }
    })
}

pub fn termination_event(instance_id: &str) -> Value {
    json!({
        "version": "0",
        "source": "aws.autoscaling",
        "detail-type": TERMINATION_DETAIL_TYPE,
        "detail": {
            "EC2InstanceId": instance_id,
            "AutoScalingGroupName": GROUP
        }
    })
}

// --- Call log helpers ---

pub fn changes_with_action(cloud: &MemoryCloud, action: ChangeAction) -> Vec<(String, Change)> {
    cloud
        .changes()
        .into_iter()
        .filter(|(_, c)| c.action == action)
        .collect()
}

pub fn tag_calls(cloud: &MemoryCloud) -> Vec<Vec<Tag>> {
    cloud
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            CloudCall::SetInstanceTags { tags, .. } => Some(tags),
            _ => None,
        })
        .collect()
}

pub fn tag_value(cloud: &MemoryCloud, instance_id: &str, key: &str) -> Option<String> {
    cloud
        .instance_tags(instance_id)?
        .into_iter()
        .find(|t| t.key == key)
        .map(|t| t.value)
}
