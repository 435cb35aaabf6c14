//! Fleet specifications and instance identity records.
//!
//! A fleet is a collection of same-role daemon instances sharing a parent
//! resource. Instances exist conceptually for every ordinal in
//! `[0, desired)`; their names are derived from the ordinal alone.

use flotilla_identity::instance_name;
use serde::{Deserialize, Serialize};

use crate::error::OperatorError;

/// Role of a fleet's daemon instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    StorageNode,
    ExportGateway,
}

/// One conceptual daemon instance of a fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonInstance {
    pub ordinal: u32,
    /// Stable letter-sequence name; never renumbered while the instance
    /// exists.
    pub identity: String,
    pub role: Role,
}

impl DaemonInstance {
    pub fn new(ordinal: u32, role: Role) -> Self {
        Self {
            ordinal,
            identity: instance_name(ordinal),
            role,
        }
    }
}

/// On-disk data-layout family of a storage daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFormat {
    FileBased,
    ObjectBased,
}

impl StoreFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreFormat::FileBased => "file",
            StoreFormat::ObjectBased => "object",
        }
    }
}

/// Optional sizing knobs passed through to the storage daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeHints {
    #[serde(default)]
    pub database_size_mb: Option<u32>,
    #[serde(default)]
    pub wal_size_mb: Option<u32>,
    #[serde(default)]
    pub journal_size_mb: Option<u32>,
}

/// User-supplied media selectors for a storage fleet.
///
/// Several selectors may be present at once; the planner honors only the
/// highest-priority non-empty one (device list > device filter > use-all >
/// directories > explicit no-media).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSelection {
    /// Explicit raw device names.
    #[serde(default)]
    pub devices: Vec<String>,
    /// Device name filter expression.
    #[serde(default)]
    pub device_filter: Option<String>,
    /// Consume every device found on the host.
    #[serde(default)]
    pub use_all_devices: bool,
    /// Host directories to back the store.
    #[serde(default)]
    pub directories: Vec<String>,
    /// Explicit config-only mode: no backing medium at all.
    #[serde(default)]
    pub no_media: bool,
}

/// Declared desired state of a storage-node fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFleetSpec {
    /// Parent resource name; embedded in every derived resource name.
    pub name: String,
    pub namespace: String,
    /// Desired instance count.
    pub desired: u32,
    pub store_format: StoreFormat,
    #[serde(default)]
    pub selection: MediaSelection,
    /// Dedicated metadata device; independent of the media selection.
    #[serde(default)]
    pub metadata_device: Option<String>,
    #[serde(default)]
    pub size_hints: SizeHints,
    #[serde(default)]
    pub host_network: bool,
}

impl StorageFleetSpec {
    /// Fail-fast validation, run before any substrate mutation.
    pub fn validate(&self) -> Result<(), OperatorError> {
        if self.name.is_empty() {
            return Err(OperatorError::validation("missing name"));
        }
        if self.namespace.is_empty() {
            return Err(OperatorError::validation("missing namespace"));
        }
        if self.desired == 0 {
            return Err(OperatorError::validation(
                "at least one storage instance required",
            ));
        }
        Ok(())
    }
}

/// One exported filesystem path of a gateway fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSpec {
    /// Backing store path being exported.
    pub path: String,
    /// Path clients see in the gateway's pseudo filesystem.
    pub pseudo_path: String,
}

/// Declared desired state of an export-gateway fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayFleetSpec {
    /// Parent resource name; embedded in every derived resource name.
    pub name: String,
    pub namespace: String,
    /// Desired count of active gateway servers.
    pub active: u32,
    /// Name of the backing store the exports come from.
    pub store_name: String,
    pub store_format: StoreFormat,
    /// Pool of the distributed recovery/grace database.
    pub recovery_pool: String,
    /// Namespace within the recovery pool, shared by the fleet.
    pub recovery_namespace: String,
    pub exports: Vec<ExportSpec>,
    #[serde(default)]
    pub host_network: bool,
}

impl GatewayFleetSpec {
    /// Fail-fast validation, run before any substrate mutation.
    pub fn validate(&self) -> Result<(), OperatorError> {
        if self.name.is_empty() {
            return Err(OperatorError::validation("missing name"));
        }
        if self.namespace.is_empty() {
            return Err(OperatorError::validation("missing namespace"));
        }
        if self.store_name.is_empty() {
            return Err(OperatorError::validation("missing store name"));
        }
        if self.recovery_pool.is_empty() {
            return Err(OperatorError::validation("missing recovery pool"));
        }
        if self.recovery_namespace.is_empty() {
            return Err(OperatorError::validation("missing recovery namespace"));
        }
        if self.exports.is_empty() {
            return Err(OperatorError::validation("at least one export is required"));
        }
        for (i, export) in self.exports.iter().enumerate() {
            if export.path.is_empty() {
                return Err(OperatorError::validation(format!(
                    "missing path for export {}",
                    i
                )));
            }
            if export.pseudo_path.is_empty() {
                return Err(OperatorError::validation(format!(
                    "missing pseudo path for export {}",
                    i
                )));
            }
        }
        if self.active == 0 {
            return Err(OperatorError::validation(
                "at least one active server required",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_spec() -> GatewayFleetSpec {
        GatewayFleetSpec {
            name: "shared".to_string(),
            namespace: "tenant-a".to_string(),
            active: 2,
            store_name: "mainstore".to_string(),
            store_format: StoreFormat::FileBased,
            recovery_pool: "recovery".to_string(),
            recovery_namespace: "shared-ns".to_string(),
            exports: vec![ExportSpec {
                path: "/data".to_string(),
                pseudo_path: "/export".to_string(),
            }],
            host_network: false,
        }
    }

    #[test]
    fn instance_identity_follows_ordinal() {
        let instance = DaemonInstance::new(27, Role::ExportGateway);
        assert_eq!(instance.identity, "ab");
        assert_eq!(instance.role, Role::ExportGateway);
    }

    #[test]
    fn valid_gateway_spec_passes() {
        assert!(gateway_spec().validate().is_ok());
    }

    #[test]
    fn gateway_spec_requires_active_servers() {
        let mut spec = gateway_spec();
        spec.active = 0;
        let err = spec.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("active server"));
    }

    #[test]
    fn gateway_spec_requires_exports() {
        let mut spec = gateway_spec();
        spec.exports.clear();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn gateway_spec_requires_export_paths() {
        let mut spec = gateway_spec();
        spec.exports[0].pseudo_path.clear();
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("pseudo path for export 0"));
    }

    #[test]
    fn gateway_spec_requires_recovery_scope() {
        let mut spec = gateway_spec();
        spec.recovery_pool.clear();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn storage_spec_requires_instances() {
        let spec = StorageFleetSpec {
            name: "main".to_string(),
            namespace: "tenant-a".to_string(),
            desired: 0,
            store_format: StoreFormat::ObjectBased,
            selection: MediaSelection::default(),
            metadata_device: None,
            size_hints: SizeHints::default(),
            host_network: false,
        };
        assert!(spec.validate().is_err());
    }
}
