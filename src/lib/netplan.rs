// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::{
    ip::{sanitize_ip_network, split_cidr, to_cidr},
    AddrIntent, BfnetError, ConfigBackend, DomainPatch, ErrorKind,
    GatewayPatch, IpPatch, IpVersion,
};

const NETWORK_KEY: &str = "network";
const ETHERNETS_KEY: &str = "ethernets";

/// Static route of declarative document.
/// ```yaml
/// routes:
/// - to: 192.0.2.0/24
///   via: 198.51.100.1
///   metric: 100
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RouteEntry {
    pub to: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub via: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub metric: Option<u32>,
    /// Route properties not managed by this project, kept verbatim.
    #[serde(flatten)]
    pub other: Mapping,
}

impl RouteEntry {
    pub fn new(to: String, via: String, metric: Option<u32>) -> Self {
        Self {
            to,
            via,
            metric,
            other: Mapping::new(),
        }
    }
}

/// Per-device entry under `ethernets`. Every attribute is optional and only
/// stored when it holds a meaningful value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub struct InterfaceConfig {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub addresses: Option<Vec<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub dhcp4: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub dhcp6: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub mtu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gateway4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gateway6: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_flatten_routes"
    )]
    pub routes: Option<Vec<RouteEntry>>,
    /// Device properties not managed by this project, e.g. `match`,
    /// `set-name`, kept verbatim.
    #[serde(flatten)]
    pub other: Mapping,
}

impl InterfaceConfig {
    /// Drop every attribute holding an empty value.
    pub fn prune(&mut self) {
        if self.addresses.as_ref().map(Vec::is_empty) == Some(true) {
            self.addresses = None;
        }
        if self.dhcp4 == Some(false) {
            self.dhcp4 = None;
        }
        if self.dhcp6 == Some(false) {
            self.dhcp6 = None;
        }
        if self.mtu == Some(0) {
            self.mtu = None;
        }
        if self.gateway4.as_deref().map(str::is_empty) == Some(true) {
            self.gateway4 = None;
        }
        if self.gateway6.as_deref().map(str::is_empty) == Some(true) {
            self.gateway6 = None;
        }
        if self.routes.as_ref().map(Vec::is_empty) == Some(true) {
            self.routes = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_none()
            && self.dhcp4.is_none()
            && self.dhcp6.is_none()
            && self.mtu.is_none()
            && self.gateway4.is_none()
            && self.gateway6.is_none()
            && self.routes.is_none()
            && self.other.is_empty()
    }

    fn merge_ip(&mut self, patch: &IpPatch) {
        self.addresses = None;
        self.dhcp4 = None;
        self.dhcp6 = None;
        let mut addrs = Vec::new();
        match patch.ipv4.as_ref() {
            Some(AddrIntent::Dhcp) => self.dhcp4 = Some(true),
            Some(AddrIntent::Static(cidr)) => addrs.push(cidr.clone()),
            None => (),
        }
        match patch.ipv6.as_ref() {
            Some(AddrIntent::Dhcp) => self.dhcp6 = Some(true),
            Some(AddrIntent::Static(cidr)) => addrs.push(cidr.clone()),
            None => (),
        }
        if !addrs.is_empty() {
            self.addresses = Some(addrs);
        }
    }

    fn merge_gateway(
        &mut self,
        patch: &GatewayPatch,
    ) -> Result<(), BfnetError> {
        patch.validate()?;
        self.routes = None;
        self.gateway4 = None;
        self.gateway6 = None;
        let mut routes = Vec::new();
        for (gateway, version) in [
            (patch.ipv4_gateway.as_ref(), IpVersion::V4),
            (patch.ipv6_gateway.as_ref(), IpVersion::V6),
        ] {
            let Some(gateway) = gateway else {
                continue;
            };
            if let Some(metric) = patch.metric {
                let to = route_destination(patch, version)?;
                routes.push(RouteEntry::new(to, gateway.clone(), Some(metric)));
            } else if version == IpVersion::V4 {
                self.gateway4 = Some(gateway.clone());
            } else {
                self.gateway6 = Some(gateway.clone());
            }
        }
        if !routes.is_empty() {
            self.routes = Some(routes);
        }
        Ok(())
    }
}

fn route_destination(
    patch: &GatewayPatch,
    version: IpVersion,
) -> Result<String, BfnetError> {
    match patch.route_network() {
        Some(network) => sanitize_ip_network(&to_cidr(
            network,
            patch.network_prefix.as_deref(),
        )?),
        None => Ok(if version == IpVersion::V6 {
            "::/0".to_string()
        } else {
            "0.0.0.0/0".to_string()
        }),
    }
}

/// Addresses of one device as stored in the document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct IpConfigView {
    pub ipv4_addr: Option<String>,
    pub ipv4_prefix: Option<String>,
    pub ipv6_addr: Option<String>,
    pub ipv6_prefix: Option<String>,
    pub dhcp4: bool,
    pub dhcp6: bool,
}

/// Gateway and routes of one device as stored in the document.
#[derive(Debug, Clone, PartialEq, Default)]
#[non_exhaustive]
pub struct GatewayConfigView {
    pub gateway4: Option<String>,
    pub gateway6: Option<String>,
    pub routes: Vec<RouteEntry>,
}

/// The declarative per-device network document.
///
/// Everything outside the managed attributes of `ethernets` entries is kept
/// as loaded, including key order.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkDocument {
    backend: ConfigBackend,
    root: Mapping,
}

impl NetworkDocument {
    pub fn new(backend: ConfigBackend) -> Self {
        let mut root = Mapping::new();
        let mut section = Mapping::new();
        section.insert(Value::from("version"), Value::from(2));
        section.insert(Value::from(ETHERNETS_KEY), Value::Mapping(Mapping::new()));
        match backend {
            ConfigBackend::Netplan => {
                root.insert(Value::from(NETWORK_KEY), Value::Mapping(section));
            }
            ConfigBackend::CloudInit => root = section,
        }
        Self { backend, root }
    }

    pub fn load(path: &Path, backend: ConfigBackend) -> Result<Self, BfnetError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BfnetError::new(
                ErrorKind::ConfigLoadError,
                format!(
                    "Failed to load configuration file {}: {e}",
                    path.display()
                ),
            )
        })?;
        Self::from_yaml(&content, backend).map_err(|e| {
            BfnetError::new(
                ErrorKind::ConfigLoadError,
                format!(
                    "Failed to load configuration file {}: {}",
                    path.display(),
                    e.msg()
                ),
            )
        })
    }

    pub fn from_yaml(
        content: &str,
        backend: ConfigBackend,
    ) -> Result<Self, BfnetError> {
        let root = match serde_yaml::from_str::<Value>(content).map_err(|e| {
            BfnetError::new(ErrorKind::ConfigLoadError, format!("{e}"))
        })? {
            Value::Mapping(m) => m,
            // An empty file is an empty document
            Value::Null => Mapping::new(),
            v => {
                return Err(BfnetError::new(
                    ErrorKind::ConfigLoadError,
                    format!("Expecting mapping at document root, got {v:?}"),
                ));
            }
        };
        let doc = Self { backend, root };
        // Validate every device entry up front
        if let Some(ethernets) = doc.ethernets()? {
            for (name, value) in ethernets.iter() {
                serde_yaml::from_value::<InterfaceConfig>(value.clone())
                    .map_err(|e| {
                        BfnetError::new(
                            ErrorKind::ConfigLoadError,
                            format!("Invalid entry of device {name:?}: {e}"),
                        )
                    })?;
            }
        }
        Ok(doc)
    }

    pub fn to_yaml(&self) -> Result<String, BfnetError> {
        serde_yaml::to_string(&self.root).map_err(|e| {
            BfnetError::new(
                ErrorKind::ConfigWriteError,
                format!("Failed to serialize network configuration: {e}"),
            )
        })
    }

    /// Replace the file at `path` with this document as a whole.
    pub fn save(&self, path: &Path) -> Result<(), BfnetError> {
        let content = self.to_yaml()?;
        let mut tmp_path = path.as_os_str().to_os_string();
        tmp_path.push(".tmp");
        let tmp_path = std::path::PathBuf::from(tmp_path);
        // The renamed file keeps the mode of the file it replaces
        let permissions = std::fs::metadata(path).ok().map(|m| m.permissions());
        std::fs::write(&tmp_path, content.as_bytes())
            .and_then(|_| match permissions {
                Some(p) => std::fs::set_permissions(&tmp_path, p),
                None => Ok(()),
            })
            .and_then(|_| std::fs::rename(&tmp_path, path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&tmp_path);
                BfnetError::new(
                    ErrorKind::ConfigWriteError,
                    format!(
                        "Failed to write into configuration file {}: {e}",
                        path.display()
                    ),
                )
            })?;
        log::debug!("Saved network configuration {}", path.display());
        Ok(())
    }

    fn section(&self) -> Result<Option<&Mapping>, BfnetError> {
        match self.backend {
            ConfigBackend::Netplan => match self.root.get(NETWORK_KEY) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::Mapping(m)) => Ok(Some(m)),
                Some(v) => Err(BfnetError::new(
                    ErrorKind::ConfigLoadError,
                    format!("Expecting mapping for `{NETWORK_KEY}`, got {v:?}"),
                )),
            },
            ConfigBackend::CloudInit => Ok(Some(&self.root)),
        }
    }

    fn section_mut(&mut self) -> Result<&mut Mapping, BfnetError> {
        match self.backend {
            ConfigBackend::Netplan => {
                if !matches!(self.root.get(NETWORK_KEY), Some(Value::Mapping(_)))
                {
                    self.root.insert(
                        Value::from(NETWORK_KEY),
                        Value::Mapping(Mapping::new()),
                    );
                }
                match self.root.get_mut(NETWORK_KEY) {
                    Some(Value::Mapping(m)) => Ok(m),
                    _ => Err(BfnetError::new(
                        ErrorKind::Bug,
                        format!("Failed to create `{NETWORK_KEY}` section"),
                    )),
                }
            }
            ConfigBackend::CloudInit => Ok(&mut self.root),
        }
    }

    fn ethernets(&self) -> Result<Option<&Mapping>, BfnetError> {
        match self.section()?.and_then(|s| s.get(ETHERNETS_KEY)) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Mapping(m)) => Ok(Some(m)),
            Some(v) => Err(BfnetError::new(
                ErrorKind::ConfigLoadError,
                format!("Expecting mapping for `{ETHERNETS_KEY}`, got {v:?}"),
            )),
        }
    }

    fn ethernets_mut(&mut self) -> Result<&mut Mapping, BfnetError> {
        let section = self.section_mut()?;
        if !matches!(section.get(ETHERNETS_KEY), Some(Value::Mapping(_))) {
            section.insert(
                Value::from(ETHERNETS_KEY),
                Value::Mapping(Mapping::new()),
            );
        }
        match section.get_mut(ETHERNETS_KEY) {
            Some(Value::Mapping(m)) => Ok(m),
            _ => Err(BfnetError::new(
                ErrorKind::Bug,
                format!("Failed to create `{ETHERNETS_KEY}` section"),
            )),
        }
    }

    /// Device names in document order.
    pub fn devices(&self) -> Result<Vec<String>, BfnetError> {
        Ok(self
            .ethernets()?
            .map(|e| {
                e.keys()
                    .filter_map(|k| k.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn interface(
        &self,
        device: &str,
    ) -> Result<Option<InterfaceConfig>, BfnetError> {
        match self.ethernets()?.and_then(|e| e.get(device)) {
            None => Ok(None),
            Some(value) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    BfnetError::new(
                        ErrorKind::ConfigLoadError,
                        format!("Invalid entry of device {device}: {e}"),
                    )
                }),
        }
    }

    /// Store `iface` for `device`, keeping its position in the document.
    /// `None` removes the device entry.
    pub fn set_interface(
        &mut self,
        device: &str,
        iface: Option<&InterfaceConfig>,
    ) -> Result<(), BfnetError> {
        let ethernets = self.ethernets_mut()?;
        match iface {
            Some(iface) => {
                let value = serde_yaml::to_value(iface).map_err(|e| {
                    BfnetError::new(
                        ErrorKind::Bug,
                        format!("Failed to serialize device {device}: {e}"),
                    )
                })?;
                ethernets.insert(Value::from(device), value);
            }
            None => {
                if ethernets.contains_key(device) {
                    let kept: Mapping = std::mem::take(ethernets)
                        .into_iter()
                        .filter(|(k, _)| k.as_str() != Some(device))
                        .collect();
                    *ethernets = kept;
                }
            }
        }
        Ok(())
    }

    pub fn get_ip_config(
        &self,
        device: &str,
    ) -> Result<IpConfigView, BfnetError> {
        let mut view = IpConfigView::default();
        let Some(iface) = self.interface(device)? else {
            return Ok(view);
        };
        for addr in iface.addresses.as_deref().unwrap_or_default() {
            let (ip, prefix) = split_cidr(addr);
            match IpVersion::classify(ip) {
                IpVersion::V4 => {
                    view.ipv4_addr = Some(ip.to_string());
                    view.ipv4_prefix = Some(prefix.to_string());
                }
                IpVersion::V6 => {
                    view.ipv6_addr = Some(ip.to_string());
                    view.ipv6_prefix = Some(prefix.to_string());
                }
                IpVersion::Invalid => {
                    log::warn!("Ignoring invalid address {addr} of {device}");
                }
            }
        }
        view.dhcp4 = iface.dhcp4 == Some(true);
        view.dhcp6 = iface.dhcp6 == Some(true);
        Ok(view)
    }

    pub fn get_mtu(&self, device: &str) -> Result<Option<u32>, BfnetError> {
        Ok(self.interface(device)?.and_then(|i| i.mtu))
    }

    pub fn get_gateway_config(
        &self,
        device: &str,
    ) -> Result<GatewayConfigView, BfnetError> {
        Ok(self
            .interface(device)?
            .map(|i| GatewayConfigView {
                gateway4: i.gateway4,
                gateway6: i.gateway6,
                routes: i.routes.unwrap_or_default(),
            })
            .unwrap_or_default())
    }

    /// Rewrite the attribute group of `patch` for `device`, carrying every
    /// other attribute forward untouched.
    pub fn merge_patch(
        &mut self,
        device: &str,
        patch: &DomainPatch,
    ) -> Result<(), BfnetError> {
        let mut iface = self.interface(device)?.unwrap_or_default();
        match patch {
            DomainPatch::Ip(p) => iface.merge_ip(p),
            DomainPatch::Mtu(mtu) => iface.mtu = *mtu,
            DomainPatch::Gateway(p) => iface.merge_gateway(p)?,
        }
        log::debug!("Merged {patch:?} into device {device}");
        self.set_interface(device, Some(&iface))
    }

    /// Remove empty attributes of `device` and the device itself once it
    /// holds nothing.
    pub fn prune_empty(&mut self, device: &str) -> Result<(), BfnetError> {
        let Some(mut iface) = self.interface(device)? else {
            return Ok(());
        };
        iface.prune();
        if iface.is_empty() {
            log::debug!("Removing empty device entry {device}");
            self.set_interface(device, None)
        } else {
            self.set_interface(device, Some(&iface))
        }
    }
}
