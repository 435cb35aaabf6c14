//! Storage backend planning.
//!
//! Collapses the store-format × media-kind decision table into an explicit
//! plan, produced once per fleet and consumed uniformly by the resource-set
//! builder. The planner never talks to the substrate.

use serde::{Deserialize, Serialize};

use crate::error::OperatorError;
use crate::fleet::{MediaSelection, SizeHints, StoreFormat};

/// The physical or logical medium backing a storage instance.
///
/// Exactly one kind applies per plan. The variants are listed in selection
/// priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaKind {
    /// Explicitly named raw devices.
    RawDevices { devices: Vec<String> },
    /// Devices matched by a filter expression.
    DeviceFilter { filter: String },
    /// Every device found on the host.
    AllDevices,
    /// Host directories.
    Directories { paths: Vec<String> },
    /// No backing medium; configuration-only instance.
    NoMedia,
}

impl MediaKind {
    /// Returns true when the medium resolves to raw host devices.
    pub fn is_device_backed(&self) -> bool {
        matches!(
            self,
            MediaKind::RawDevices { .. } | MediaKind::DeviceFilter { .. } | MediaKind::AllDevices
        )
    }
}

/// Resolved provisioning plan for one storage fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBackendPlan {
    pub store_format: StoreFormat,
    pub media: MediaKind,
    pub metadata_device: Option<String>,
    pub size_hints: SizeHints,
}

impl StorageBackendPlan {
    /// True when the workload must mount `/dev` and `/run/udev` from the
    /// host: any device-backed medium, or a metadata device regardless of
    /// the medium.
    pub fn needs_device_mounts(&self) -> bool {
        self.media.is_device_backed() || self.metadata_device.is_some()
    }

    /// True for the one combination that cannot invoke the daemon binary
    /// directly: a file-based store on raw devices. The daemon process must
    /// itself mount the device by partition UUID, run, and unmount on exit,
    /// so the launcher and a runtime supervisor are staged into a shared
    /// ephemeral volume by a helper container.
    pub fn needs_binary_staging(&self) -> bool {
        self.store_format == StoreFormat::FileBased && self.media.is_device_backed()
    }
}

/// Resolves the media selection into a plan.
///
/// Only the highest-priority non-empty selector is honored: explicit device
/// list > device filter > use-all flag > directory list > explicit no-media.
/// Lower-priority selectors are ignored once a higher one is set.
pub fn plan(
    store_format: StoreFormat,
    selection: &MediaSelection,
    metadata_device: Option<String>,
    size_hints: SizeHints,
) -> Result<StorageBackendPlan, OperatorError> {
    let media = if !selection.devices.is_empty() {
        MediaKind::RawDevices {
            devices: selection.devices.clone(),
        }
    } else if let Some(filter) = selection.device_filter.as_ref().filter(|f| !f.is_empty()) {
        MediaKind::DeviceFilter {
            filter: filter.clone(),
        }
    } else if selection.use_all_devices {
        MediaKind::AllDevices
    } else if !selection.directories.is_empty() {
        MediaKind::Directories {
            paths: selection.directories.clone(),
        }
    } else if selection.no_media {
        MediaKind::NoMedia
    } else {
        return Err(OperatorError::validation("empty volumes"));
    };

    Ok(StorageBackendPlan {
        store_format,
        media,
        metadata_device,
        size_hints,
    })
}
