//! In-memory substrate for tests and development.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::SubstrateClient;
use crate::error::{ResourceKind, SubstrateError};
use crate::resources::{ConfigArtifact, NetworkEndpoint, WorkloadDescriptor};

/// One recorded client operation, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateConfigArtifact(String),
    UpdateConfigArtifact(String),
    DeleteConfigArtifact(String),
    CreateWorkload(String),
    DeleteWorkload(String),
    CreateEndpoint(String),
    DeleteEndpoint(String),
}

/// Substrate backed by process-local maps.
///
/// Mirrors the create/update/delete semantics of the real substrate:
/// duplicate creates report `AlreadyExists`, deletes of absent resources
/// report `NotFound`. Every call is appended to an operation log so tests
/// can assert exactly what a reconciliation pass touched.
#[derive(Default)]
pub struct InMemorySubstrate {
    configs: RwLock<BTreeMap<(String, String), ConfigArtifact>>,
    workloads: RwLock<BTreeMap<(String, String), WorkloadDescriptor>>,
    endpoints: RwLock<BTreeMap<(String, String), NetworkEndpoint>>,
    operations: RwLock<Vec<Operation>>,
}

impl InMemorySubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, op: Operation) {
        self.operations.write().await.push(op);
    }

    /// Returns a copy of the operation log.
    pub async fn operations(&self) -> Vec<Operation> {
        self.operations.read().await.clone()
    }

    /// Returns the total number of recorded operations.
    pub async fn operation_count(&self) -> usize {
        self.operations.read().await.len()
    }

    /// Looks up a stored config artifact.
    pub async fn config_artifact(&self, namespace: &str, name: &str) -> Option<ConfigArtifact> {
        self.configs
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Looks up a stored workload descriptor.
    pub async fn workload(&self, namespace: &str, name: &str) -> Option<WorkloadDescriptor> {
        self.workloads
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Looks up a stored network endpoint.
    pub async fn endpoint(&self, namespace: &str, name: &str) -> Option<NetworkEndpoint> {
        self.endpoints
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Names of all workloads in a namespace, sorted.
    pub async fn workload_names(&self, namespace: &str) -> Vec<String> {
        self.workloads
            .read()
            .await
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Names of all endpoints in a namespace, sorted.
    pub async fn endpoint_names(&self, namespace: &str) -> Vec<String> {
        self.endpoints
            .read()
            .await
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Names of all config artifacts in a namespace, sorted.
    pub async fn config_artifact_names(&self, namespace: &str) -> Vec<String> {
        self.configs
            .read()
            .await
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect()
    }
}

#[async_trait]
impl SubstrateClient for InMemorySubstrate {
    async fn create_config_artifact(
        &self,
        namespace: &str,
        artifact: &ConfigArtifact,
    ) -> Result<(), SubstrateError> {
        self.record(Operation::CreateConfigArtifact(artifact.name.clone()))
            .await;
        let key = (namespace.to_string(), artifact.name.clone());
        let mut configs = self.configs.write().await;
        if configs.contains_key(&key) {
            return Err(SubstrateError::AlreadyExists {
                kind: ResourceKind::ConfigArtifact,
                name: artifact.name.clone(),
            });
        }
        debug!(namespace, name = %artifact.name, "created config artifact");
        configs.insert(key, artifact.clone());
        Ok(())
    }

    async fn update_config_artifact(
        &self,
        namespace: &str,
        artifact: &ConfigArtifact,
    ) -> Result<(), SubstrateError> {
        self.record(Operation::UpdateConfigArtifact(artifact.name.clone()))
            .await;
        let key = (namespace.to_string(), artifact.name.clone());
        let mut configs = self.configs.write().await;
        if !configs.contains_key(&key) {
            return Err(SubstrateError::NotFound {
                kind: ResourceKind::ConfigArtifact,
                name: artifact.name.clone(),
            });
        }
        configs.insert(key, artifact.clone());
        Ok(())
    }

    async fn delete_config_artifact(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), SubstrateError> {
        self.record(Operation::DeleteConfigArtifact(name.to_string()))
            .await;
        let key = (namespace.to_string(), name.to_string());
        match self.configs.write().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(SubstrateError::NotFound {
                kind: ResourceKind::ConfigArtifact,
                name: name.to_string(),
            }),
        }
    }

    async fn create_workload(
        &self,
        namespace: &str,
        workload: &WorkloadDescriptor,
    ) -> Result<(), SubstrateError> {
        self.record(Operation::CreateWorkload(workload.name.clone()))
            .await;
        let key = (namespace.to_string(), workload.name.clone());
        let mut workloads = self.workloads.write().await;
        if workloads.contains_key(&key) {
            return Err(SubstrateError::AlreadyExists {
                kind: ResourceKind::Workload,
                name: workload.name.clone(),
            });
        }
        debug!(namespace, name = %workload.name, "created workload");
        workloads.insert(key, workload.clone());
        Ok(())
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), SubstrateError> {
        self.record(Operation::DeleteWorkload(name.to_string())).await;
        let key = (namespace.to_string(), name.to_string());
        match self.workloads.write().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(SubstrateError::NotFound {
                kind: ResourceKind::Workload,
                name: name.to_string(),
            }),
        }
    }

    async fn create_endpoint(
        &self,
        namespace: &str,
        endpoint: &NetworkEndpoint,
    ) -> Result<(), SubstrateError> {
        self.record(Operation::CreateEndpoint(endpoint.name.clone()))
            .await;
        let key = (namespace.to_string(), endpoint.name.clone());
        let mut endpoints = self.endpoints.write().await;
        if endpoints.contains_key(&key) {
            return Err(SubstrateError::AlreadyExists {
                kind: ResourceKind::Endpoint,
                name: endpoint.name.clone(),
            });
        }
        debug!(namespace, name = %endpoint.name, "created endpoint");
        endpoints.insert(key, endpoint.clone());
        Ok(())
    }

    async fn delete_endpoint(&self, namespace: &str, name: &str) -> Result<(), SubstrateError> {
        self.record(Operation::DeleteEndpoint(name.to_string())).await;
        let key = (namespace.to_string(), name.to_string());
        match self.endpoints.write().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(SubstrateError::NotFound {
                kind: ResourceKind::Endpoint,
                name: name.to_string(),
            }),
        }
    }
}
