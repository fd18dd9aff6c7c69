//! Error types for instance-ddns.

use thiserror::Error;

/// Errors that can occur while handling a lifecycle event.
#[derive(Debug, Error)]
pub enum DdnsError {
    /// A zone, record, instance, or tag was absent when expected.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed event payload or invalid input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport, auth, or throttling failure reported by a collaborator.
    #[error("{service} service error: {message}")]
    Remote {
        /// Collaborator that failed (e.g. "inventory", "zone").
        service: &'static str,
        /// Error message as reported by the collaborator.
        message: String,
    },

    /// Annotation (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// DNS name parsing error
    #[error("DNS name error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error (event input, fixture files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DdnsError {
    /// Build a [`DdnsError::Remote`] for the given collaborator.
    pub fn remote(service: &'static str, message: impl Into<String>) -> Self {
        Self::Remote {
            service,
            message: message.into(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Remote { .. } => "remote",
            Self::Serialization(_) => "serialization",
            Self::Proto(_) => "proto",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}
