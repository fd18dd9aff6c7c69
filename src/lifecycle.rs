//! Record lifecycle for a single instance.
//!
//! On launch the forward A and reverse PTR records are created and their
//! descriptors are stored as tags on the instance itself. On termination the
//! tags are read back and exactly those records are deleted. The tags are the
//! only durable state; nothing is kept between events.
//!
//! ```text
//!   launch                                   termination
//!     │                                          │
//!     ├─ instance, vpc(Domain), subnet           ├─ instance tags
//!     ├─ forward name, reverse name              ├─ ForwardRR? ── delete
//!     ├─ forward zone, reverse zone              └─ ReverseRR? ── delete
//!     ├─ UPSERT A     (forward zone)
//!     ├─ UPSERT PTR   (reverse zone)
//!     └─ tag: Name, ForwardRR, ReverseRR
//! ```

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DdnsConfig;
use crate::error::DdnsError;
use crate::event::{LaunchEvent, TerminationEvent};
use crate::metrics;
use crate::naming::{self, NameDeriver};
use crate::provider::{tag_map, Inventory, Tag, ZoneService};
use crate::record::{RecordMutator, RecordType, ResourceRecordDescriptor};
use crate::zone::ZoneResolver;

/// Tag holding the derived hostname, for operators.
pub const NAME_TAG: &str = "Name";

/// Tag holding the serialized A record descriptor.
pub const FORWARD_RR_TAG: &str = "lambda:ddns:ForwardRR";

/// Tag holding the serialized PTR record descriptor.
pub const REVERSE_RR_TAG: &str = "lambda:ddns:ReverseRR";

/// Records created for a launched instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedRecords {
    /// Derived hostname.
    pub hostname: String,
    /// The A record.
    pub forward: ResourceRecordDescriptor,
    /// The PTR record.
    pub reverse: ResourceRecordDescriptor,
}

/// Records removed for a terminated instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedRecords {
    /// Descriptors that were deleted, in deletion order.
    pub deleted: Vec<ResourceRecordDescriptor>,
    /// Tag keys that were absent and therefore skipped.
    pub skipped: Vec<&'static str>,
}

/// Drives record creation on launch and removal on termination.
#[derive(Clone)]
pub struct LifecycleCorrelator {
    inventory: Arc<dyn Inventory>,
    resolver: ZoneResolver,
    mutator: RecordMutator,
    names: NameDeriver,
    config: Arc<DdnsConfig>,
}

impl LifecycleCorrelator {
    /// Create a correlator over the given collaborators.
    pub fn new(
        inventory: Arc<dyn Inventory>,
        zones: Arc<dyn ZoneService>,
        config: DdnsConfig,
    ) -> Self {
        Self {
            inventory,
            resolver: ZoneResolver::new(zones.clone()),
            mutator: RecordMutator::new(zones),
            names: NameDeriver::new(config.instance_id_prefix.clone()),
            config: Arc::new(config),
        }
    }

    /// Create both records for a launched instance and tag it with them.
    ///
    /// Steps run strictly in order. If the PTR upsert fails after the A
    /// upsert succeeded, the A record stays in place and no tags are written.
    pub async fn on_launch(&self, event: &LaunchEvent) -> Result<ProvisionedRecords, DdnsError> {
        let instance = self.inventory.get_instance(&event.instance_id).await?;
        let vpc = self.inventory.get_vpc(&instance.vpc_id).await?;
        let subnet = self.inventory.get_subnet(&event.subnet_id).await?;

        let domain = tag_map(&vpc.tags)
            .get(self.config.domain_tag.as_str())
            .map(|d| d.to_string())
            .ok_or_else(|| {
                DdnsError::NotFound(format!(
                    "{} tag on vpc {}",
                    self.config.domain_tag, vpc.vpc_id
                ))
            })?;

        let hostname =
            self.names
                .forward_name(&event.group_name, &instance.instance_id, &domain)?;
        let ptr_name = naming::reverse_name(instance.private_ip);
        let address = naming::select_address(&instance, &subnet)?;

        debug!(
            instance_id = %instance.instance_id,
            hostname = %hostname,
            reverse = %ptr_name.fqdn,
            address = %address,
            "derived names"
        );

        let forward_zone = self.resolver.resolve_zone(&domain).await?;
        let reverse_zone = self.resolver.resolve_zone(&ptr_name.zone).await?;

        let forward = self
            .mutator
            .upsert(
                &forward_zone.zone_id,
                RecordType::A,
                &hostname,
                &address.to_string(),
                self.config.ttl,
            )
            .await?
            .descriptor;

        let reverse = match self
            .mutator
            .upsert(
                &reverse_zone.zone_id,
                RecordType::Ptr,
                &ptr_name.fqdn,
                &hostname,
                self.config.ttl,
            )
            .await
        {
            Ok(result) => result.descriptor,
            Err(e) => {
                warn!(
                    instance_id = %instance.instance_id,
                    hostname = %hostname,
                    error = %e,
                    "PTR upsert failed, A record left in place"
                );
                return Err(e);
            }
        };

        let tags = vec![
            Tag::new(NAME_TAG, hostname.clone()),
            Tag::new(FORWARD_RR_TAG, forward.to_annotation()?),
            Tag::new(REVERSE_RR_TAG, reverse.to_annotation()?),
        ];
        self.inventory
            .set_instance_tags(&instance.instance_id, tags)
            .await?;

        info!(
            instance_id = %instance.instance_id,
            hostname = %hostname,
            address = %address,
            "instance provisioned"
        );

        Ok(ProvisionedRecords {
            hostname,
            forward,
            reverse,
        })
    }

    /// Delete the records named in a terminated instance's tags.
    ///
    /// Absent tags are skipped without error. Deletes run forward first and
    /// stop at the first failure.
    pub async fn on_termination(
        &self,
        event: &TerminationEvent,
    ) -> Result<RemovedRecords, DdnsError> {
        let instance = self.inventory.get_instance(&event.instance_id).await?;

        let descriptors = {
            let tags = tag_map(&instance.tags);
            let mut descriptors = Vec::with_capacity(2);
            for key in [FORWARD_RR_TAG, REVERSE_RR_TAG] {
                let descriptor = match tags.get(key) {
                    Some(value) => Some(ResourceRecordDescriptor::from_annotation(value)?),
                    None => None,
                };
                descriptors.push((key, descriptor));
            }
            descriptors
        };

        let mut removed = RemovedRecords::default();
        for (key, descriptor) in descriptors {
            let Some(descriptor) = descriptor else {
                debug!(instance_id = %event.instance_id, tag = key, "no annotation, skipping");
                metrics::record_annotation_skipped(key);
                removed.skipped.push(key);
                continue;
            };

            self.mutator.delete(&descriptor).await?;
            removed.deleted.push(descriptor);
        }

        info!(
            instance_id = %event.instance_id,
            deleted = removed.deleted.len(),
            skipped = removed.skipped.len(),
            "instance records removed"
        );

        Ok(removed)
    }
}
