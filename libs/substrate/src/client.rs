//! Orchestration substrate client interface.

use async_trait::async_trait;

use crate::error::SubstrateError;
use crate::resources::{ConfigArtifact, NetworkEndpoint, WorkloadDescriptor};

/// Narrow client surface the reconciler drives resource sets through.
///
/// Every operation is a single bounded call; timeouts belong to the
/// underlying transport, not to the caller. Creates report `AlreadyExists`
/// and deletes report `NotFound` instead of failing, which is what makes
/// reconciliation passes safe to retry.
#[async_trait]
pub trait SubstrateClient: Send + Sync {
    /// Create a config artifact.
    async fn create_config_artifact(
        &self,
        namespace: &str,
        artifact: &ConfigArtifact,
    ) -> Result<(), SubstrateError>;

    /// Replace the contents of an existing config artifact in place.
    /// Identity-derived naming is preserved; only the payload changes.
    async fn update_config_artifact(
        &self,
        namespace: &str,
        artifact: &ConfigArtifact,
    ) -> Result<(), SubstrateError>;

    /// Delete a config artifact by name.
    async fn delete_config_artifact(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), SubstrateError>;

    /// Create a workload descriptor.
    async fn create_workload(
        &self,
        namespace: &str,
        workload: &WorkloadDescriptor,
    ) -> Result<(), SubstrateError>;

    /// Delete a workload descriptor by name.
    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), SubstrateError>;

    /// Create a network endpoint.
    async fn create_endpoint(
        &self,
        namespace: &str,
        endpoint: &NetworkEndpoint,
    ) -> Result<(), SubstrateError>;

    /// Delete a network endpoint by name.
    async fn delete_endpoint(&self, namespace: &str, name: &str) -> Result<(), SubstrateError>;
}
