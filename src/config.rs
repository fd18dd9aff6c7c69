//! Configuration types for instance-ddns.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::DdnsError;
use crate::record::DEFAULT_TTL;

/// Environment variable prefix; nested keys use `__` (`INSTANCE_DDNS__DDNS__TTL`).
pub const ENV_PREFIX: &str = "INSTANCE_DDNS";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Record lifecycle configuration.
    #[serde(default)]
    pub ddns: DdnsConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load from an optional TOML file layered with environment overrides.
    pub fn load(path: &Path) -> Result<Self, DdnsError> {
        ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DdnsError::Config(e.to_string()))
    }
}

/// Record lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// TTL for the A and PTR records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// VPC tag whose value is the forward domain (e.g., "prod.internal").
    #[serde(default = "default_domain_tag")]
    pub domain_tag: String,

    /// Vendor prefix stripped from instance ids when building hostnames.
    #[serde(default = "default_instance_id_prefix")]
    pub instance_id_prefix: String,
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            domain_tag: default_domain_tag(),
            instance_id_prefix: default_instance_id_prefix(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "instance_ddns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
            prometheus_addr: None,
        }
    }
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_domain_tag() -> String {
    "Domain".to_string()
}

fn default_instance_id_prefix() -> String {
    "i-".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
