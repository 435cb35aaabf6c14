//! Declarative descriptor types for instance resource sets.
//!
//! All maps are `BTreeMap` so that serializing the same logical descriptor
//! twice yields byte-identical output. The reconciler relies on this to make
//! update-in-place a no-op when nothing changed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-instance configuration artifact: named key/value payloads consumed
/// by the daemon at startup (environment-style pairs or rendered files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigArtifact {
    /// Derived resource name, `{app}-{fleet}-{instance}`.
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub data: BTreeMap<String, String>,
}

/// An environment variable passed to a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Where a volume's contents come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VolumeSource {
    /// A directory on the host.
    HostPath { path: String },
    /// Ephemeral scratch space shared between containers of one workload.
    EmptyDir,
    /// A key of a config artifact projected as a file.
    ConfigArtifact {
        artifact: String,
        key: String,
        path: String,
    },
}

/// A named volume declared on a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub name: String,
    pub source: VolumeSource,
}

/// A mount of a declared volume into a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub name: String,
    pub path: String,
}

impl VolumeMount {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// One container of a workload descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Entry point. Empty means the image default.
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub mounts: Vec<VolumeMount>,
    /// Required for containers that mount host devices.
    #[serde(default)]
    pub privileged: bool,
}

/// Restart behavior of a workload's daemon phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    #[default]
    Always,
    OnFailure,
    Never,
}

/// Name resolution behavior for a workload's containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsPolicy {
    /// Cluster resolver first.
    #[default]
    ClusterFirst,
    /// Cluster resolver first even though the workload shares the host's
    /// network namespace.
    ClusterFirstWithHostNet,
}

/// Per-instance workload descriptor.
///
/// Horizontal scale is achieved by adding more instances (more names),
/// never by raising `replicas` inside one descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadDescriptor {
    /// Derived resource name, `{app}-{fleet}-{instance}`.
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Setup phases run to completion, in order, before the daemon phase.
    #[serde(default)]
    pub init_containers: Vec<ContainerSpec>,
    pub containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub volumes: Vec<VolumeSpec>,
    #[serde(default)]
    pub host_network: bool,
    #[serde(default)]
    pub host_pid: bool,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    /// Must be `ClusterFirstWithHostNet` when `host_network` is set, or the
    /// workload loses cluster name resolution.
    #[serde(default)]
    pub dns_policy: DnsPolicy,
    /// Always 1 for fleet instances; kept explicit in the wire format.
    pub replicas: u32,
}

/// How an endpoint is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointAddressing {
    /// Cluster-internal virtual address.
    ClusterInternal,
    /// No virtual address; clients reach the host directly.
    HostMode,
}

/// Per-instance network endpoint (gateway instances).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    /// Derived resource name, `{app}-{fleet}-{instance}`.
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Instance selector; matches the workload's labels.
    pub selector: BTreeMap<String, String>,
    pub port: u16,
    pub addressing: EndpointAddressing,
}
