//! Hostname derivation for instances.
//!
//! Forward names look like `<group>-<instance id without prefix>.<domain>.`;
//! reverse names follow the `in-addr.arpa.` convention with one zone per /24.

use hickory_proto::rr::Name;
use std::net::Ipv4Addr;

use crate::error::DdnsError;
use crate::provider::{Instance, Subnet};

/// Suffix of every IPv4 reverse name.
pub const IN_ADDR_ARPA: &str = "in-addr.arpa.";

/// Parse and normalize a domain name to its trailing-dot form.
pub fn fqdn(name: &str) -> Result<String, DdnsError> {
    if name.is_empty() || name == "." {
        return Err(DdnsError::Validation("domain name is empty".to_string()));
    }
    let mut parsed = Name::from_ascii(name)?;
    parsed.set_fqdn(true);
    Ok(parsed.to_ascii())
}

/// Reverse-lookup names for one IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseName {
    /// `d.c.b.a.in-addr.arpa.`
    pub fqdn: String,
    /// `c.b.a.in-addr.arpa.`, the /24 reverse zone.
    pub zone: String,
}

/// Derive the PTR owner name and reverse zone for `addr`.
pub fn reverse_name(addr: Ipv4Addr) -> ReverseName {
    let [a, b, c, d] = addr.octets();
    ReverseName {
        fqdn: format!("{d}.{c}.{b}.{a}.{IN_ADDR_ARPA}"),
        zone: reverse_zone_name(addr),
    }
}

/// The /24 reverse zone holding `addr`'s PTR record.
pub fn reverse_zone_name(addr: Ipv4Addr) -> String {
    let [a, b, c, _] = addr.octets();
    format!("{c}.{b}.{a}.{IN_ADDR_ARPA}")
}

/// Address published in the forward record.
///
/// Subnets that auto-assign public addresses publish the public address;
/// everything else publishes the private one.
pub fn select_address(instance: &Instance, subnet: &Subnet) -> Result<Ipv4Addr, DdnsError> {
    if !subnet.map_public_ip_on_launch {
        return Ok(instance.private_ip);
    }
    instance.public_ip.ok_or_else(|| {
        DdnsError::NotFound(format!(
            "public address for instance {} in subnet {}",
            instance.instance_id, subnet.subnet_id
        ))
    })
}

/// Builds forward hostnames.
#[derive(Debug, Clone)]
pub struct NameDeriver {
    instance_id_prefix: String,
}

impl NameDeriver {
    /// Create a deriver that strips `instance_id_prefix` from instance ids.
    pub fn new(instance_id_prefix: impl Into<String>) -> Self {
        Self {
            instance_id_prefix: instance_id_prefix.into(),
        }
    }

    /// `"{group_name}-{short id}.{domain}."`
    pub fn forward_name(
        &self,
        group_name: &str,
        instance_id: &str,
        domain: &str,
    ) -> Result<String, DdnsError> {
        if group_name.is_empty() {
            return Err(DdnsError::Validation("group name is empty".to_string()));
        }
        let short_id = instance_id
            .strip_prefix(self.instance_id_prefix.as_str())
            .unwrap_or(instance_id);
        if short_id.is_empty() {
            return Err(DdnsError::Validation(format!(
                "instance id {instance_id:?} has nothing after its prefix"
            )));
        }
        let domain = domain.trim_end_matches('.');
        fqdn(&format!("{group_name}-{short_id}.{domain}"))
    }
}

impl Default for NameDeriver {
    fn default() -> Self {
        Self::new("i-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(public_ip: Option<&str>) -> Instance {
        Instance {
            instance_id: "i-0abc123".to_string(),
            vpc_id: "vpc-1".to_string(),
            private_ip: "10.0.1.55".parse().unwrap(),
            public_ip: public_ip.map(|ip| ip.parse().unwrap()),
            tags: vec![],
        }
    }

    fn subnet(public: bool) -> Subnet {
        Subnet {
            subnet_id: "subnet-1".to_string(),
            map_public_ip_on_launch: public,
        }
    }

    #[test]
    fn test_forward_name_strips_prefix() {
        let deriver = NameDeriver::default();
        let name = deriver
            .forward_name("web", "i-0abc123", "prod.internal")
            .unwrap();
        assert_eq!(name, "web-0abc123.prod.internal.");
    }

    #[test]
    fn test_forward_name_accepts_qualified_domain() {
        let deriver = NameDeriver::default();
        let name = deriver
            .forward_name("web", "i-0abc123", "prod.internal.")
            .unwrap();
        assert_eq!(name, "web-0abc123.prod.internal.");
    }

    #[test]
    fn test_forward_name_without_prefix_keeps_id() {
        let deriver = NameDeriver::default();
        let name = deriver.forward_name("db", "vm42", "example.com").unwrap();
        assert_eq!(name, "db-vm42.example.com.");
    }

    #[test]
    fn test_forward_name_custom_prefix() {
        let deriver = NameDeriver::new("vm-");
        let name = deriver.forward_name("api", "vm-77", "example.com").unwrap();
        assert_eq!(name, "api-77.example.com.");
    }

    #[test]
    fn test_forward_name_rejects_empty_parts() {
        let deriver = NameDeriver::default();
        assert!(matches!(
            deriver.forward_name("", "i-1", "example.com"),
            Err(DdnsError::Validation(_))
        ));
        assert!(matches!(
            deriver.forward_name("web", "i-", "example.com"),
            Err(DdnsError::Validation(_))
        ));
    }

    #[test]
    fn test_forward_name_rejects_oversized_label() {
        let deriver = NameDeriver::default();
        let group = "g".repeat(70);
        assert!(deriver.forward_name(&group, "i-1", "example.com").is_err());
    }

    #[test]
    fn test_reverse_name() {
        let reverse = reverse_name("10.0.1.55".parse().unwrap());
        assert_eq!(reverse.fqdn, "55.1.0.10.in-addr.arpa.");
        assert_eq!(reverse.zone, "1.0.10.in-addr.arpa.");
    }

    #[test]
    fn test_reverse_name_boundaries() {
        let zero = reverse_name(Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(zero.fqdn, "0.0.0.0.in-addr.arpa.");
        assert_eq!(zero.zone, "0.0.0.in-addr.arpa.");

        let max = reverse_name(Ipv4Addr::new(255, 255, 255, 255));
        assert_eq!(max.fqdn, "255.255.255.255.in-addr.arpa.");
        assert_eq!(max.zone, "255.255.255.in-addr.arpa.");
    }

    #[test]
    fn test_reverse_name_octet_order() {
        let reverse = reverse_name(Ipv4Addr::new(1, 2, 3, 4));
        assert_eq!(reverse.fqdn, "4.3.2.1.in-addr.arpa.");
        assert_eq!(reverse.zone, "3.2.1.in-addr.arpa.");
        assert_eq!(reverse_zone_name(Ipv4Addr::new(1, 2, 3, 4)), reverse.zone);
    }

    #[test]
    fn test_reverse_zone_is_fqdn_minus_first_label() {
        for addr in [
            Ipv4Addr::new(192, 168, 0, 1),
            Ipv4Addr::new(172, 16, 254, 0),
            Ipv4Addr::new(8, 8, 4, 4),
        ] {
            let reverse = reverse_name(addr);
            let (_, rest) = reverse.fqdn.split_once('.').unwrap();
            assert_eq!(rest, reverse.zone);
        }
    }

    #[test]
    fn test_select_private_address() {
        let addr = select_address(&instance(Some("54.1.2.3")), &subnet(false)).unwrap();
        assert_eq!(addr, Ipv4Addr::new(10, 0, 1, 55));
    }

    #[test]
    fn test_select_public_address() {
        let addr = select_address(&instance(Some("54.1.2.3")), &subnet(true)).unwrap();
        assert_eq!(addr, Ipv4Addr::new(54, 1, 2, 3));
    }

    #[test]
    fn test_select_public_address_missing() {
        let err = select_address(&instance(None), &subnet(true)).unwrap_err();
        assert!(matches!(err, DdnsError::NotFound(_)));
    }

    #[test]
    fn test_fqdn_normalizes() {
        assert_eq!(fqdn("prod.internal").unwrap(), "prod.internal.");
        assert_eq!(fqdn("prod.internal.").unwrap(), "prod.internal.");
        assert!(fqdn("").is_err());
    }
}
