//! HTTP substrate client.
//!
//! Talks to the orchestration substrate's REST API. The spec of the API is
//! outside this crate; here we only rely on its status-code conventions:
//! 409 for duplicate creates, 404 for missing resources.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::client::SubstrateClient;
use crate::error::{ResourceKind, SubstrateError};
use crate::resources::{ConfigArtifact, NetworkEndpoint, WorkloadDescriptor};

/// Default timeout for substrate API calls.
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Substrate client backed by the orchestration REST API.
pub struct HttpSubstrate {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSubstrate {
    /// Create a new client for the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn collection_url(&self, namespace: &str, kind: ResourceKind) -> String {
        format!(
            "{}/v1/namespaces/{}/{}s",
            self.base_url,
            namespace,
            kind.as_str()
        )
    }

    fn resource_url(&self, namespace: &str, kind: ResourceKind, name: &str) -> String {
        format!("{}/{}", self.collection_url(namespace, kind), name)
    }

    async fn create<T: Serialize + Sync>(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
        body: &T,
    ) -> Result<(), SubstrateError> {
        let url = self.collection_url(namespace, kind);
        debug!(url = %url, name, "creating resource");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SubstrateError::Transport(e.to_string()))?;

        Self::check(kind, name, response).await
    }

    async fn update<T: Serialize + Sync>(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
        body: &T,
    ) -> Result<(), SubstrateError> {
        let url = self.resource_url(namespace, kind, name);
        debug!(url = %url, "updating resource");

        let response = self
            .client
            .put(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SubstrateError::Transport(e.to_string()))?;

        Self::check(kind, name, response).await
    }

    async fn delete(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<(), SubstrateError> {
        let url = self.resource_url(namespace, kind, name);
        debug!(url = %url, "deleting resource");

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| SubstrateError::Transport(e.to_string()))?;

        Self::check(kind, name, response).await
    }

    async fn check(
        kind: ResourceKind,
        name: &str,
        response: reqwest::Response,
    ) -> Result<(), SubstrateError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        match status {
            reqwest::StatusCode::CONFLICT => Err(SubstrateError::AlreadyExists {
                kind,
                name: name.to_string(),
            }),
            reqwest::StatusCode::NOT_FOUND => Err(SubstrateError::NotFound {
                kind,
                name: name.to_string(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(SubstrateError::Transport(format!(
                    "{} {}: {} - {}",
                    kind, name, status, body
                )))
            }
        }
    }
}

#[async_trait]
impl SubstrateClient for HttpSubstrate {
    async fn create_config_artifact(
        &self,
        namespace: &str,
        artifact: &ConfigArtifact,
    ) -> Result<(), SubstrateError> {
        self.create(namespace, ResourceKind::ConfigArtifact, &artifact.name, artifact)
            .await
    }

    async fn update_config_artifact(
        &self,
        namespace: &str,
        artifact: &ConfigArtifact,
    ) -> Result<(), SubstrateError> {
        self.update(namespace, ResourceKind::ConfigArtifact, &artifact.name, artifact)
            .await
    }

    async fn delete_config_artifact(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), SubstrateError> {
        self.delete(namespace, ResourceKind::ConfigArtifact, name).await
    }

    async fn create_workload(
        &self,
        namespace: &str,
        workload: &WorkloadDescriptor,
    ) -> Result<(), SubstrateError> {
        self.create(namespace, ResourceKind::Workload, &workload.name, workload)
            .await
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), SubstrateError> {
        self.delete(namespace, ResourceKind::Workload, name).await
    }

    async fn create_endpoint(
        &self,
        namespace: &str,
        endpoint: &NetworkEndpoint,
    ) -> Result<(), SubstrateError> {
        self.create(namespace, ResourceKind::Endpoint, &endpoint.name, endpoint)
            .await
    }

    async fn delete_endpoint(&self, namespace: &str, name: &str) -> Result<(), SubstrateError> {
        self.delete(namespace, ResourceKind::Endpoint, name).await
    }
}
