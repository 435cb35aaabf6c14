//! Resource-set builder for export-gateway instances.

use std::fmt::Write as _;

use flotilla_identity::{instance_labels, resource_name};
use flotilla_substrate::{
    ConfigArtifact, ContainerSpec, EndpointAddressing, EnvVar, NetworkEndpoint, RestartPolicy,
    VolumeMount, VolumeSource, VolumeSpec, WorkloadDescriptor,
};

use crate::builder::{
    dns_policy, ResourceSet, CONFIG_VOLUME, DATA_DIR_VOLUME, DEFAULT_DATA_DIR, GATEWAY_APP_NAME,
    GATEWAY_PORT,
};
use crate::config::Config;
use crate::fleet::{DaemonInstance, GatewayFleetSpec};

const CONFIG_KEY: &str = "gateway.conf";
const CONFIG_MOUNT_PATH: &str = "/etc/gateway";

/// Builds the resource set for one export-gateway instance.
pub fn build(
    instance: &DaemonInstance,
    fleet: &GatewayFleetSpec,
    config: &Config,
) -> ResourceSet {
    let name = resource_name(GATEWAY_APP_NAME, &fleet.name, &instance.identity);
    let labels = instance_labels(
        GATEWAY_APP_NAME,
        &fleet.namespace,
        &fleet.name,
        &instance.identity,
    );

    let artifact = ConfigArtifact {
        name: name.clone(),
        labels: labels.clone(),
        data: [(
            CONFIG_KEY.to_string(),
            render_export_config(fleet, &instance.identity),
        )]
        .into(),
    };

    let volumes = vec![
        VolumeSpec {
            name: DATA_DIR_VOLUME.to_string(),
            source: VolumeSource::EmptyDir,
        },
        VolumeSpec {
            name: CONFIG_VOLUME.to_string(),
            source: VolumeSource::ConfigArtifact {
                artifact: name.clone(),
                key: CONFIG_KEY.to_string(),
                path: CONFIG_KEY.to_string(),
            },
        },
    ];

    let workload = WorkloadDescriptor {
        name: name.clone(),
        labels: labels.clone(),
        init_containers: vec![],
        containers: vec![ContainerSpec {
            name: "gateway".to_string(),
            image: config.gateway_image.clone(),
            command: vec![],
            args: vec![
                "gateway".to_string(),
                "--config".to_string(),
                format!("{}/{}", CONFIG_MOUNT_PATH, CONFIG_KEY),
            ],
            env: vec![
                EnvVar::new("FLOTILLA_INSTANCE", instance.identity.clone()),
                EnvVar::new("FLOTILLA_CLUSTER", fleet.namespace.clone()),
            ],
            mounts: vec![
                VolumeMount::new(DATA_DIR_VOLUME, DEFAULT_DATA_DIR),
                VolumeMount::new(CONFIG_VOLUME, CONFIG_MOUNT_PATH),
            ],
            privileged: false,
        }],
        volumes,
        host_network: fleet.host_network,
        host_pid: false,
        restart_policy: RestartPolicy::Always,
        dns_policy: dns_policy(fleet.host_network),
        // Fan-out happens through the per-ordinal instance loop, never by
        // raising the replica count of one descriptor.
        replicas: 1,
    };

    // With host networking there is nothing to give a virtual address to;
    // clients reach the host directly.
    let addressing = if fleet.host_network {
        EndpointAddressing::HostMode
    } else {
        EndpointAddressing::ClusterInternal
    };
    let endpoint = NetworkEndpoint {
        name: name.clone(),
        labels: labels.clone(),
        selector: labels,
        port: GATEWAY_PORT,
        addressing,
    };

    ResourceSet {
        config: artifact,
        workload,
        endpoint: Some(endpoint),
    }
}

/// Renders the gateway configuration file for one instance.
///
/// Export blocks are numbered from 1 in declaration order. The final line
/// points the daemon at its per-instance object in the shared recovery
/// namespace; the tab separator and the `conf-` prefix are part of the
/// daemon's include syntax and must not change.
pub fn render_export_config(fleet: &GatewayFleetSpec, identity: &str) -> String {
    let mut out = String::new();

    out.push_str("NFS_CORE_PARAM {\n");
    out.push_str("\tEnable_NLM = false;\n");
    out.push_str("\tEnable_RQUOTA = false;\n");
    out.push_str("\tProtocols = 4;\n");
    let _ = writeln!(out, "\tNFS_Port = {};", GATEWAY_PORT);
    out.push_str("}\n\n");

    out.push_str("NFSv4 {\n");
    out.push_str("\tRecoveryBackend = 'rados_kv';\n");
    out.push_str("}\n\n");

    out.push_str("RADOS_KV {\n");
    let _ = writeln!(out, "\tpool = '{}';", fleet.recovery_pool);
    let _ = writeln!(out, "\tnamespace = '{}';", fleet.recovery_namespace);
    let _ = writeln!(out, "\tnodeid = '{}';", identity);
    out.push_str("}\n\n");

    for (i, export) in fleet.exports.iter().enumerate() {
        out.push_str("EXPORT {\n");
        let _ = writeln!(out, "\tExport_Id = {};", i + 1);
        let _ = writeln!(out, "\tPath = '{}';", export.path);
        let _ = writeln!(out, "\tPseudo = '{}';", export.pseudo_path);
        out.push_str("\tAccess_Type = RW;\n");
        out.push_str("\tSquash = none;\n");
        out.push_str("\tFSAL {\n");
        let _ = writeln!(out, "\t\tName = '{}';", fleet.store_name);
        out.push_str("\t}\n");
        out.push_str("}\n\n");
    }

    let _ = writeln!(
        out,
        "%url\trados://{}/{}/conf-{}",
        fleet.recovery_pool, fleet.recovery_namespace, identity
    );
    out
}
