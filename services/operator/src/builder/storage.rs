//! Resource-set builder for storage-node instances.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use flotilla_identity::{instance_labels, resource_name, volume_name_for_path};
use flotilla_substrate::{
    ConfigArtifact, ContainerSpec, EnvVar, RestartPolicy, VolumeMount, VolumeSource, VolumeSpec,
    WorkloadDescriptor,
};

use crate::builder::{
    dns_policy, ResourceSet, BINARIES_MOUNT_PATH, BINARIES_VOLUME, DATA_DIR_VOLUME,
    DEFAULT_DATA_DIR, DEVICES_VOLUME, STORAGE_APP_NAME, UDEV_VOLUME,
};
use crate::config::Config;
use crate::fleet::{DaemonInstance, StorageFleetSpec, StoreFormat};
use crate::planner::{MediaKind, StorageBackendPlan};

const STORE_FORMAT_ENV: &str = "FLOTILLA_STORE_FORMAT";
const DATA_DEVICES_ENV: &str = "FLOTILLA_DATA_DEVICES";
const DEVICE_FILTER_ENV: &str = "FLOTILLA_DATA_DEVICE_FILTER";
const DATA_DIRECTORIES_ENV: &str = "FLOTILLA_DATA_DIRECTORIES";
const METADATA_DEVICE_ENV: &str = "FLOTILLA_METADATA_DEVICE";
const DATABASE_SIZE_ENV: &str = "FLOTILLA_DATABASE_SIZE_MB";
const WAL_SIZE_ENV: &str = "FLOTILLA_WAL_SIZE_MB";
const JOURNAL_SIZE_ENV: &str = "FLOTILLA_JOURNAL_SIZE_MB";
const INSTANCE_ENV: &str = "FLOTILLA_INSTANCE";
const DATA_DIR_ENV: &str = "FLOTILLA_DATA_DIR";
const STAGING_PATH_ENV: &str = "FLOTILLA_STAGING_PATH";

/// Builds the resource set for one storage-node instance.
pub fn build(
    instance: &DaemonInstance,
    plan: &StorageBackendPlan,
    fleet: &StorageFleetSpec,
    config: &Config,
) -> ResourceSet {
    let name = resource_name(STORAGE_APP_NAME, &fleet.name, &instance.identity);
    let labels = instance_labels(
        STORAGE_APP_NAME,
        &fleet.namespace,
        &fleet.name,
        &instance.identity,
    );
    let pairs = backend_config_pairs(plan);

    let artifact = ConfigArtifact {
        name: name.clone(),
        labels: labels.clone(),
        data: pairs.clone(),
    };

    let data_path = format!("{}/{}", DEFAULT_DATA_DIR, instance.identity);
    let privileged = plan.needs_device_mounts();

    let mut volumes = vec![VolumeSpec {
        name: DATA_DIR_VOLUME.to_string(),
        source: VolumeSource::HostPath {
            path: config.data_dir_host_path.clone(),
        },
    }];
    let mut daemon_mounts = vec![VolumeMount::new(DATA_DIR_VOLUME, DEFAULT_DATA_DIR)];

    if let MediaKind::Directories { paths } = &plan.media {
        let mut mounted_parents = BTreeSet::new();
        for path in paths {
            // The default data directory is already mounted; anything else
            // needs its parent directory brought in from the host. Sibling
            // directories share one parent mount.
            if path == DEFAULT_DATA_DIR {
                continue;
            }
            let parent = parent_dir(path);
            if !mounted_parents.insert(parent.clone()) {
                continue;
            }
            let volume = volume_name_for_path(&parent);
            volumes.push(VolumeSpec {
                name: volume.clone(),
                source: VolumeSource::HostPath {
                    path: parent.clone(),
                },
            });
            daemon_mounts.push(VolumeMount::new(volume, parent));
        }
    }

    if plan.needs_device_mounts() {
        volumes.push(VolumeSpec {
            name: DEVICES_VOLUME.to_string(),
            source: VolumeSource::HostPath {
                path: "/dev".to_string(),
            },
        });
        volumes.push(VolumeSpec {
            name: UDEV_VOLUME.to_string(),
            source: VolumeSource::HostPath {
                path: "/run/udev".to_string(),
            },
        });
        daemon_mounts.push(VolumeMount::new(DEVICES_VOLUME, "/dev"));
        daemon_mounts.push(VolumeMount::new(UDEV_VOLUME, "/run/udev"));
    }

    let env = container_env(&pairs, &instance.identity);
    let mut init_containers = vec![ContainerSpec {
        name: "config-init".to_string(),
        image: config.operator_image.clone(),
        command: vec![],
        args: vec!["storage".to_string(), "init".to_string()],
        env: env.clone(),
        mounts: vec![VolumeMount::new(DATA_DIR_VOLUME, DEFAULT_DATA_DIR)],
        privileged,
    }];

    let mut common_args = vec![
        "--foreground".to_string(),
        "--id".to_string(),
        instance.identity.clone(),
        "--data-dir".to_string(),
        data_path.clone(),
    ];
    if plan.store_format == StoreFormat::FileBased {
        common_args.push(format!("--journal={}/journal", data_path));
    }

    let (command, args) = if plan.needs_binary_staging() {
        // The file-based store on a raw device cannot exec the daemon
        // directly: the launcher mounts the device by partition UUID, runs
        // the daemon, and unmounts on exit. Both the launcher and the
        // supervisor binary are staged into a shared ephemeral volume.
        let staging_mount = VolumeMount::new(BINARIES_VOLUME, BINARIES_MOUNT_PATH);
        volumes.push(VolumeSpec {
            name: BINARIES_VOLUME.to_string(),
            source: VolumeSource::EmptyDir,
        });
        daemon_mounts.push(staging_mount.clone());
        init_containers.push(ContainerSpec {
            name: "stage-binaries".to_string(),
            image: config.operator_image.clone(),
            command: vec![],
            args: vec!["storage".to_string(), "stage-binaries".to_string()],
            env: vec![EnvVar::new(STAGING_PATH_ENV, BINARIES_MOUNT_PATH)],
            mounts: vec![staging_mount],
            privileged: false,
        });

        let command = vec![format!("{}/supervise", BINARIES_MOUNT_PATH)];
        let mut args = vec![
            "--".to_string(),
            format!("{}/flotilla", BINARIES_MOUNT_PATH),
            "storage".to_string(),
            "filestore-device".to_string(),
            "--mount-path".to_string(),
            data_path.clone(),
            "--".to_string(),
        ];
        args.extend(common_args);
        (command, args)
    } else {
        // Every other combination launches the daemon binary directly.
        (vec!["storaged".to_string()], common_args)
    };

    let workload = WorkloadDescriptor {
        name: name.clone(),
        labels: labels.clone(),
        init_containers,
        containers: vec![ContainerSpec {
            name: "daemon".to_string(),
            image: config.storage_image.clone(),
            command,
            args,
            env,
            mounts: daemon_mounts,
            privileged,
        }],
        volumes,
        host_network: fleet.host_network,
        host_pid: true,
        restart_policy: RestartPolicy::Always,
        dns_policy: dns_policy(fleet.host_network),
        replicas: 1,
    };

    ResourceSet {
        config: artifact,
        workload,
        endpoint: None,
    }
}

/// Environment-style key/value pairs carrying the backend selection.
/// Optional knobs appear only when non-default/non-zero.
fn backend_config_pairs(plan: &StorageBackendPlan) -> BTreeMap<String, String> {
    let mut pairs = BTreeMap::new();
    pairs.insert(
        STORE_FORMAT_ENV.to_string(),
        plan.store_format.as_str().to_string(),
    );

    match &plan.media {
        MediaKind::RawDevices { devices } => {
            pairs.insert(DATA_DEVICES_ENV.to_string(), devices.join(","));
        }
        MediaKind::DeviceFilter { filter } => {
            pairs.insert(DEVICE_FILTER_ENV.to_string(), filter.clone());
        }
        MediaKind::AllDevices => {
            pairs.insert(DEVICE_FILTER_ENV.to_string(), "all".to_string());
        }
        MediaKind::Directories { paths } => {
            pairs.insert(DATA_DIRECTORIES_ENV.to_string(), paths.join(","));
        }
        MediaKind::NoMedia => {}
    }

    if let Some(device) = &plan.metadata_device {
        pairs.insert(METADATA_DEVICE_ENV.to_string(), device.clone());
    }
    if let Some(mb) = plan.size_hints.database_size_mb.filter(|mb| *mb != 0) {
        pairs.insert(DATABASE_SIZE_ENV.to_string(), mb.to_string());
    }
    if let Some(mb) = plan.size_hints.wal_size_mb.filter(|mb| *mb != 0) {
        pairs.insert(WAL_SIZE_ENV.to_string(), mb.to_string());
    }
    if let Some(mb) = plan.size_hints.journal_size_mb.filter(|mb| *mb != 0) {
        pairs.insert(JOURNAL_SIZE_ENV.to_string(), mb.to_string());
    }

    pairs
}

fn container_env(pairs: &BTreeMap<String, String>, identity: &str) -> Vec<EnvVar> {
    let mut env = vec![
        EnvVar::new(INSTANCE_ENV, identity),
        EnvVar::new(DATA_DIR_ENV, DEFAULT_DATA_DIR),
    ];
    env.extend(pairs.iter().map(|(k, v)| EnvVar::new(k.clone(), v.clone())));
    env
}

/// Parent directory of a path, as a string. Falls back to the path itself
/// for single-component paths.
fn parent_dir(path: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.to_string_lossy().into_owned()
        }
        _ => path.to_string(),
    }
}
