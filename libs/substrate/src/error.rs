//! Error types for substrate operations.

use thiserror::Error;

/// The kinds of resources a daemon instance owns on the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Per-instance configuration artifact.
    ConfigArtifact,
    /// Per-instance workload descriptor.
    Workload,
    /// Per-instance network endpoint (gateway instances only).
    Endpoint,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ConfigArtifact => "config-artifact",
            ResourceKind::Workload => "workload",
            ResourceKind::Endpoint => "endpoint",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by substrate client operations.
#[derive(Debug, Error)]
pub enum SubstrateError {
    /// The resource already exists. Non-fatal on creation: config artifacts
    /// are updated instead, other resources are treated as converged.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    /// The resource does not exist. Non-fatal on deletion: treated as
    /// already converged.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    /// Transport-level failure (network, auth, serialization). Propagated
    /// to the caller; the fleet is left partially converged and the pass
    /// is expected to be retried.
    #[error("substrate transport error: {0}")]
    Transport(String),
}

impl SubstrateError {
    /// Returns true if this error means the resource was already present.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, SubstrateError::AlreadyExists { .. })
    }

    /// Returns true if this error means the resource was already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SubstrateError::NotFound { .. })
    }
}
