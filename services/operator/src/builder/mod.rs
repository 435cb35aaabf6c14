//! Resource-set builders.
//!
//! Pure transformations from (instance, plan, fleet spec) to the
//! declarative resource set representing one daemon instance on the
//! substrate. Builders are deterministic: identical inputs produce
//! byte-identical descriptors, which makes update-in-place a no-op when
//! nothing changed. Applying the set is the reconciler's job.

pub mod gateway;
pub mod storage;

use flotilla_substrate::{ConfigArtifact, DnsPolicy, NetworkEndpoint, WorkloadDescriptor};

/// Application name embedded in storage-node resource names.
pub const STORAGE_APP_NAME: &str = "flotilla-storage";

/// Application name embedded in export-gateway resource names.
pub const GATEWAY_APP_NAME: &str = "flotilla-gateway";

/// Platform-default data directory inside every daemon container.
pub const DEFAULT_DATA_DIR: &str = "/var/lib/flotilla";

/// Mount path of the shared ephemeral volume used for binary staging.
pub const BINARIES_MOUNT_PATH: &str = "/flotilla-bin";

/// Fixed NFS protocol port exposed by gateway instances.
pub const GATEWAY_PORT: u16 = 2049;

pub(crate) const DATA_DIR_VOLUME: &str = "data-dir";
pub(crate) const CONFIG_VOLUME: &str = "gateway-config";
pub(crate) const BINARIES_VOLUME: &str = "daemon-binaries";
pub(crate) const DEVICES_VOLUME: &str = "devices";
pub(crate) const UDEV_VOLUME: &str = "udev";

/// DNS behavior for a workload: sharing the host's network namespace
/// requires the host-net variant to keep cluster name resolution working.
pub(crate) fn dns_policy(host_network: bool) -> DnsPolicy {
    if host_network {
        DnsPolicy::ClusterFirstWithHostNet
    } else {
        DnsPolicy::ClusterFirst
    }
}

/// The group of descriptors representing one daemon instance.
///
/// Invariant: all descriptors carry the same identity-derived name as the
/// owning instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSet {
    pub config: ConfigArtifact,
    pub workload: WorkloadDescriptor,
    /// Present for gateway instances only.
    pub endpoint: Option<NetworkEndpoint>,
}
