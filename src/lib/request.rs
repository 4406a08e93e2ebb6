// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    ip::{split_cidr, to_cidr},
    BfnetError, ErrorKind, IpVersion, NameserverUpdate, RoceQosIntent,
    SearchUpdate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Operation {
    IpConfig,
    MtuConfig,
    GwConfig,
    DnsConfig,
    DomainConfig,
    RoceConfig,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Self::IpConfig,
        Self::MtuConfig,
        Self::GwConfig,
        Self::DnsConfig,
        Self::DomainConfig,
        Self::RoceConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IpConfig => "ipconfig",
            Self::MtuConfig => "mtuconfig",
            Self::GwConfig => "gwconfig",
            Self::DnsConfig => "dnsconfig",
            Self::DomainConfig => "domainconfig",
            Self::RoceConfig => "roceconfig",
        }
    }

    /// Whether this operation acts on a device and hence requires a port or
    /// device name.
    pub fn needs_device(&self) -> bool {
        !matches!(self, Self::DnsConfig | Self::DomainConfig)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = BfnetError;

    fn from_str(s: &str) -> Result<Self, BfnetError> {
        Self::ALL
            .iter()
            .find(|o| o.as_str() == s)
            .copied()
            .ok_or_else(|| {
                BfnetError::new(
                    ErrorKind::InvalidArgument,
                    format!("Operation {s} is not supported"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Show,
    Set,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Set => "set",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = BfnetError;

    fn from_str(s: &str) -> Result<Self, BfnetError> {
        match s {
            "show" => Ok(Self::Show),
            "set" => Ok(Self::Set),
            _ => Err(BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Action {s} is not supported"),
            )),
        }
    }
}

/// Network devices a port maps to. Filled by discovery or by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DeviceContext {
    /// Network device holding IP configuration, e.g. `p0m0`
    pub device: Option<String>,
    /// Network device whose QoS is managed, e.g. `p0`
    pub roce_device: Option<String>,
    /// PCI address for register access, e.g. `0000:03:00.0`
    pub pci_device: Option<String>,
}

impl DeviceContext {
    pub fn new(device: &str) -> Self {
        Self {
            device: Some(device.to_string()),
            ..Default::default()
        }
    }

    pub fn with_roce(mut self, roce_device: &str, pci_device: &str) -> Self {
        self.roce_device = Some(roce_device.to_string());
        self.pci_device = Some(pci_device.to_string());
        self
    }

    pub(crate) fn require_device(&self) -> Result<&str, BfnetError> {
        self.device.as_deref().ok_or_else(|| {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                "Network device is required, use '--port' or '--device'"
                    .to_string(),
            )
        })
    }

    pub(crate) fn require_roce_device(&self) -> Result<&str, BfnetError> {
        self.roce_device.as_deref().ok_or_else(|| {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                "RoCE network device is required, use '--port'".to_string(),
            )
        })
    }

    pub(crate) fn require_pci_device(&self) -> Result<&str, BfnetError> {
        self.pci_device.as_deref().ok_or_else(|| {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                "PCI device is required, use '--port'".to_string(),
            )
        })
    }
}

/// Desired address of one IP family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddrIntent {
    Dhcp,
    /// Address in `ip/prefix` form
    Static(String),
}

impl AddrIntent {
    pub const DHCP_KEYWORD: &'static str = "dhcp";

    /// Parse `dhcp` or an address with optional prefix (length or IPv4
    /// netmask) of the `expected` family.
    pub fn parse(
        addr: &str,
        prefix: Option<&str>,
        expected: IpVersion,
    ) -> Result<Self, BfnetError> {
        if addr == Self::DHCP_KEYWORD {
            return Ok(Self::Dhcp);
        }
        let version = IpVersion::classify(addr);
        if version != expected {
            return Err(BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Expecting {expected} address, got '{addr}'"),
            ));
        }
        Ok(Self::Static(to_cidr(addr, prefix)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct IpPatch {
    pub ipv4: Option<AddrIntent>,
    pub ipv6: Option<AddrIntent>,
}

impl IpPatch {
    pub fn new(ipv4: Option<AddrIntent>, ipv6: Option<AddrIntent>) -> Self {
        Self { ipv4, ipv6 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct GatewayPatch {
    pub ipv4_gateway: Option<String>,
    pub ipv6_gateway: Option<String>,
    /// Destination network of the route, default route when unset
    pub network: Option<String>,
    pub network_prefix: Option<String>,
    /// When set, gateways are stored as `routes` entries carrying this
    /// metric instead of `gateway4`/`gateway6`.
    pub metric: Option<u32>,
}

impl GatewayPatch {
    pub fn new(
        ipv4_gateway: Option<String>,
        ipv6_gateway: Option<String>,
    ) -> Self {
        Self {
            ipv4_gateway,
            ipv6_gateway,
            ..Default::default()
        }
    }

    pub fn with_route(
        mut self,
        network: Option<String>,
        network_prefix: Option<String>,
        metric: Option<u32>,
    ) -> Self {
        self.network = network;
        self.network_prefix = network_prefix;
        self.metric = metric;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), BfnetError> {
        for (gw, expected) in [
            (self.ipv4_gateway.as_deref(), IpVersion::V4),
            (self.ipv6_gateway.as_deref(), IpVersion::V6),
        ] {
            if let Some(gw) = gw {
                if IpVersion::classify(gw) != expected {
                    return Err(BfnetError::new(
                        ErrorKind::InvalidArgument,
                        format!("Expecting {expected} gateway, got '{gw}'"),
                    ));
                }
                if let Some(network) = self.route_network() {
                    let version = IpVersion::classify(split_cidr(network).0);
                    if version != expected {
                        return Err(BfnetError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "Network {network} is not reachable through \
                                 {expected} gateway {gw}"
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Destination network, `None` for the default route.
    pub(crate) fn route_network(&self) -> Option<&str> {
        self.network.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Change to one attribute group of a device entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainPatch {
    Ip(IpPatch),
    Mtu(Option<u32>),
    Gateway(GatewayPatch),
}

/// Desired change of one [Operation].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SetRequest {
    Ip(IpPatch),
    Mtu(Option<u32>),
    Gateway(GatewayPatch),
    Dns(NameserverUpdate),
    Domain(SearchUpdate),
    Roce(RoceQosIntent),
}

impl SetRequest {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Ip(_) => Operation::IpConfig,
            Self::Mtu(_) => Operation::MtuConfig,
            Self::Gateway(_) => Operation::GwConfig,
            Self::Dns(_) => Operation::DnsConfig,
            Self::Domain(_) => Operation::DomainConfig,
            Self::Roce(_) => Operation::RoceConfig,
        }
    }

    pub(crate) fn domain_patch(&self) -> Option<DomainPatch> {
        match self {
            Self::Ip(p) => Some(DomainPatch::Ip(p.clone())),
            Self::Mtu(m) => Some(DomainPatch::Mtu(*m)),
            Self::Gateway(p) => Some(DomainPatch::Gateway(p.clone())),
            _ => None,
        }
    }
}
