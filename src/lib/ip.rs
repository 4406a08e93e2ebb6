// SPDX-License-Identifier: Apache-2.0

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{BfnetError, ErrorKind};

const IPV4_ADDR_LEN: u8 = 32;
const IPV6_ADDR_LEN: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpVersion {
    #[serde(rename = "IPv4")]
    V4,
    #[serde(rename = "IPv6")]
    V6,
    Invalid,
}

impl IpVersion {
    pub fn classify(addr: &str) -> Self {
        match IpAddr::from_str(addr.trim()) {
            Ok(IpAddr::V4(_)) => Self::V4,
            Ok(IpAddr::V6(_)) => Self::V6,
            Err(_) => Self::Invalid,
        }
    }

    pub fn max_prefix_len(&self) -> u8 {
        match self {
            Self::V4 => IPV4_ADDR_LEN,
            Self::V6 | Self::Invalid => IPV6_ADDR_LEN,
        }
    }
}

impl std::fmt::Display for IpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::V4 => "IPv4",
                Self::V6 => "IPv6",
                Self::Invalid => "Invalid",
            }
        )
    }
}

/// Convert dotted IPv4 netmask like `255.255.255.0` to prefix length.
pub fn netmask_to_prefix(netmask: &str) -> Result<u8, BfnetError> {
    let mask = Ipv4Addr::from_str(netmask.trim()).map_err(|e| {
        BfnetError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid netmask '{netmask}': {e}"),
        )
    })?;
    let bits = u32::from(mask);
    let prefix = bits.count_ones();
    // Only contiguous leading ones form a netmask
    if bits.checked_shl(prefix).unwrap_or(0) != 0 {
        return Err(BfnetError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid netmask '{netmask}': not contiguous"),
        ));
    }
    Ok(prefix as u8)
}

/// Parse prefix given either as length (`24`) or, for IPv4, as netmask
/// (`255.255.255.0`).
pub fn parse_prefix(prefix: &str, version: IpVersion) -> Result<u8, BfnetError> {
    let prefix = prefix.trim();
    if version == IpVersion::V4 && prefix.contains('.') {
        return netmask_to_prefix(prefix);
    }
    let len = prefix.parse::<u8>().map_err(|e| {
        BfnetError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid network prefix length '{prefix}': {e}"),
        )
    })?;
    if len > version.max_prefix_len() {
        return Err(BfnetError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Invalid {version} network prefix length '{prefix}', should \
                 be in the range of 0 to {}",
                version.max_prefix_len()
            ),
        ));
    }
    Ok(len)
}

/// Validate an address plus prefix and format it as `addr/prefix`.
/// A missing prefix means host route length of the address family.
pub fn to_cidr(
    addr: &str,
    prefix: Option<&str>,
) -> Result<String, BfnetError> {
    let ip = IpAddr::from_str(addr.trim()).map_err(|e| {
        BfnetError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IP address '{addr}': {e}"),
        )
    })?;
    let version = if ip.is_ipv6() {
        IpVersion::V6
    } else {
        IpVersion::V4
    };
    let prefix = match prefix {
        Some(p) if !p.trim().is_empty() => parse_prefix(p, version)?,
        _ => version.max_prefix_len(),
    };
    Ok(format!("{ip}/{prefix}"))
}

/// Split `addr/prefix` into its parts. Address without prefix yields an
/// empty prefix string.
pub fn split_cidr(cidr: &str) -> (&str, &str) {
    match cidr.split_once('/') {
        Some((addr, prefix)) => (addr, prefix),
        None => (cidr, ""),
    }
}

/// Normalize `ip/prefix` network string: host bits are cleared and a
/// missing prefix becomes host route length.
pub fn sanitize_ip_network(ip_net: &str) -> Result<String, BfnetError> {
    let ip_nets: Vec<&str> = ip_net.split('/').collect();
    match ip_nets.as_slice() {
        [ip] => to_cidr(ip, None),
        [ip, prefix] => {
            let ip = IpAddr::from_str(ip).map_err(|e| {
                BfnetError::new(
                    ErrorKind::InvalidArgument,
                    format!("Invalid IP network '{ip_net}': {e}"),
                )
            })?;
            let version = if ip.is_ipv6() {
                IpVersion::V6
            } else {
                IpVersion::V4
            };
            let prefix_len = parse_prefix(prefix, version)?;
            Ok(format!("{}/{prefix_len}", apply_ip_prefix_len(ip, prefix_len)))
        }
        _ => Err(BfnetError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Invalid IP network string: '{ip_net}', expecting 'ip/prefix' \
                 or 'ip' format, for example: 192.0.2.0/24 or 2001:db8:1::/64 \
                 or 192.0.2.1"
            ),
        )),
    }
}

fn apply_ip_prefix_len(ip: IpAddr, prefix_length: u8) -> IpAddr {
    if prefix_length == 0 {
        return if ip.is_ipv6() {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
    }

    match ip {
        IpAddr::V4(i) => {
            if prefix_length >= IPV4_ADDR_LEN {
                return ip;
            }
            let mask = u32::MAX << (IPV4_ADDR_LEN - prefix_length);
            IpAddr::V4(Ipv4Addr::from(u32::from(i) & mask))
        }
        IpAddr::V6(i) => {
            if prefix_length >= IPV6_ADDR_LEN {
                return ip;
            }
            let mask = u128::MAX << (IPV6_ADDR_LEN - prefix_length);
            IpAddr::V6(Ipv6Addr::from(u128::from(i) & mask))
        }
    }
}
