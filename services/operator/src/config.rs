//! Configuration for the fleet operator.

use anyhow::Result;

/// Fleet operator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Orchestration substrate API URL.
    pub substrate_url: String,

    /// Image carrying the operator's launcher and supervisor binaries,
    /// used for setup phases and binary staging.
    pub operator_image: String,

    /// Image for storage daemon containers.
    pub storage_image: String,

    /// Image for export gateway containers.
    pub gateway_image: String,

    /// Host path backing the default data directory of every instance.
    pub data_dir_host_path: String,

    /// Recovery coordination tool invoked for grace database membership.
    pub grace_tool: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            substrate_url: "http://127.0.0.1:8080".to_string(),
            operator_image: "flotilla/operator:latest".to_string(),
            storage_image: "flotilla/storage:latest".to_string(),
            gateway_image: "flotilla/gateway:latest".to_string(),
            data_dir_host_path: "/var/lib/flotilla".to_string(),
            grace_tool: "rados-grace".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults above for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        Ok(Self {
            substrate_url: std::env::var("FLOTILLA_SUBSTRATE_URL")
                .unwrap_or(defaults.substrate_url),
            operator_image: std::env::var("FLOTILLA_OPERATOR_IMAGE")
                .unwrap_or(defaults.operator_image),
            storage_image: std::env::var("FLOTILLA_STORAGE_IMAGE")
                .unwrap_or(defaults.storage_image),
            gateway_image: std::env::var("FLOTILLA_GATEWAY_IMAGE")
                .unwrap_or(defaults.gateway_image),
            data_dir_host_path: std::env::var("FLOTILLA_DATA_DIR")
                .unwrap_or(defaults.data_dir_host_path),
            grace_tool: std::env::var("FLOTILLA_GRACE_TOOL").unwrap_or(defaults.grace_tool),
            log_level: std::env::var("FLOTILLA_LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}
