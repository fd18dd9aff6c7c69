//! Hosted zone resolution.

use std::sync::Arc;
use tracing::debug;

use crate::error::DdnsError;
use crate::metrics;
use crate::naming::fqdn;
use crate::provider::ZoneService;

/// A resolved domain to zone mapping. Never cached across events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneReference {
    /// Domain the lookup was made for, trailing-dot qualified.
    pub domain_name: String,
    /// Bare hosted zone id.
    pub zone_id: String,
}

/// Maps domain names to hosted zone ids.
#[derive(Clone)]
pub struct ZoneResolver {
    zones: Arc<dyn ZoneService>,
}

impl ZoneResolver {
    /// Create a resolver over the given zone service.
    pub fn new(zones: Arc<dyn ZoneService>) -> Self {
        Self { zones }
    }

    /// Resolve `domain_name` to the zone that is authoritative for it.
    ///
    /// The first zone the service returns wins; several zones sharing one
    /// name are not told apart. A first zone whose name differs from the
    /// requested one means no zone exists for it.
    pub async fn resolve_zone(&self, domain_name: &str) -> Result<ZoneReference, DdnsError> {
        let domain_name = fqdn(domain_name)?;
        let zones = self.zones.list_zones_by_name(&domain_name).await?;

        let matched = zones
            .into_iter()
            .next()
            .filter(|zone| same_name(&zone.name, &domain_name));

        let Some(zone) = matched else {
            metrics::record_zone_lookup(false);
            return Err(DdnsError::NotFound(format!("hosted zone for {domain_name}")));
        };

        let zone_id = bare_zone_id(&zone.id).to_string();
        debug!(domain = %domain_name, zone_id = %zone_id, "resolved hosted zone");
        metrics::record_zone_lookup(true);

        Ok(ZoneReference {
            domain_name,
            zone_id,
        })
    }
}

/// Strip the `/hostedzone/` path some listings put in front of the id.
pub fn bare_zone_id(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn same_name(zone_name: &str, domain_name: &str) -> bool {
    zone_name
        .trim_end_matches('.')
        .eq_ignore_ascii_case(domain_name.trim_end_matches('.'))
}
