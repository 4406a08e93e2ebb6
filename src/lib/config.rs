// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{BfnetError, ErrorKind, LogLevel};

/// Which declarative network document is authoritative on this host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ConfigBackend {
    /// `/etc/netplan/*.yaml`, document rooted at `network:`, applied by
    /// `netplan apply`.
    #[default]
    Netplan,
    /// cloud-init NoCloud seed, document rooted at `ethernets:`, applied by
    /// re-running cloud-init before `netplan apply`.
    CloudInit,
}

/// How ipconfig, mtuconfig and gwconfig changes are made effective.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ApplyMode {
    /// Patch the declarative document and apply it, with rollback.
    #[default]
    Persistent,
    /// Run `ip` commands only, the declarative document is untouched.
    Runtime,
}

/// Immutable settings of one invocation. Built once at start-up and passed
/// to every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
#[non_exhaustive]
pub struct AdmConfig {
    pub backend: ConfigBackend,
    pub apply_mode: ApplyMode,
    pub netplan_config: PathBuf,
    pub cloud_init_config: PathBuf,
    pub resolv_conf: PathBuf,
    /// `PATH` exported to every external tool.
    pub tool_search_path: String,
    pub ip_tool: String,
    pub netplan_tool: String,
    pub cloud_init_tool: String,
    pub mlnx_qos_tool: String,
    /// Absolute path, its presence gates RoCE changes.
    pub mlxreg_tool: PathBuf,
    pub cat_tool: String,
    pub tee_tool: String,
    pub sysfs_net: PathBuf,
    pub sysfs_infiniband: PathBuf,
    pub log_level: LogLevel,
}

impl Default for AdmConfig {
    fn default() -> Self {
        Self {
            backend: ConfigBackend::default(),
            apply_mode: ApplyMode::default(),
            netplan_config: PathBuf::from(Self::NETPLAN_CONFIG),
            cloud_init_config: PathBuf::from(Self::CLOUD_INIT_CONFIG),
            resolv_conf: PathBuf::from("/etc/resolv.conf"),
            tool_search_path: "/opt/mellanox/iproute2/sbin:/usr/sbin:\
                               /usr/bin:/sbin:/bin"
                .to_string(),
            ip_tool: "ip".to_string(),
            netplan_tool: "netplan".to_string(),
            cloud_init_tool: "cloud-init".to_string(),
            mlnx_qos_tool: "mlnx_qos".to_string(),
            mlxreg_tool: PathBuf::from("/usr/bin/mlxreg"),
            cat_tool: "cat".to_string(),
            tee_tool: "tee".to_string(),
            sysfs_net: PathBuf::from("/sys/class/net"),
            sysfs_infiniband: PathBuf::from("/sys/class/infiniband"),
            log_level: LogLevel::default(),
        }
    }
}

impl AdmConfig {
    pub const DEFAULT_PATH: &'static str = "/etc/bfnetadm/config.yml";
    const NETPLAN_CONFIG: &'static str = "/etc/netplan/60-mlnx.yaml";
    const CLOUD_INIT_CONFIG: &'static str =
        "/var/lib/cloud/seed/nocloud-net/network-config";

    /// Path of the authoritative declarative document for the selected
    /// backend.
    pub fn network_config(&self) -> &Path {
        match self.backend {
            ConfigBackend::Netplan => self.netplan_config.as_path(),
            ConfigBackend::CloudInit => self.cloud_init_config.as_path(),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, BfnetError> {
        serde_yaml::from_str(content).map_err(|e| {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid configuration: {e}"),
            )
        })
    }

    /// Load from `path`, falling back to defaults when the file does not
    /// exist.
    pub fn load(path: &Path) -> Result<Self, BfnetError> {
        if !path.exists() {
            log::debug!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Failed to read configuration file {}: {e}",
                    path.display()
                ),
            )
        })?;
        Self::from_yaml(&content)
    }
}
