// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use crate::{AdmConfig, BfnetError, DeviceContext, ErrorKind};

/// Ports of the adapter, each owning one PCI function.
pub const PORTS: [u8; 2] = [0, 1];

// Representor functions of port N are enumerated as mlx5_<N + 2>.
const NETDEV_IB_OFFSET: u8 = 2;

fn check_port(port: u8) -> Result<(), BfnetError> {
    if PORTS.contains(&port) {
        Ok(())
    } else {
        Err(BfnetError::new(
            ErrorKind::InvalidArgument,
            format!("Port {port} does not exist, should be 0 or 1"),
        ))
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<String>, BfnetError> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map_err(|e| {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Failed to list {}: {e}", dir.display()),
            )
        })?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(ToString::to_string))
        .collect();
    names.sort_unstable();
    Ok(names)
}

/// PCI address of the function behind `port`, e.g. `0000:03:00.0`.
pub fn pci_device(config: &AdmConfig, port: u8) -> Result<String, BfnetError> {
    check_port(port)?;
    let link = config
        .sysfs_infiniband
        .join(format!("mlx5_{port}"))
        .join("device");
    let target = std::fs::canonicalize(&link).map_err(|e| {
        BfnetError::new(
            ErrorKind::InvalidArgument,
            format!("Failed to resolve {}: {e}", link.display()),
        )
    })?;
    target
        .file_name()
        .and_then(|n| n.to_str())
        .map(ToString::to_string)
        .ok_or_else(|| {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("No PCI device found for port {port}"),
            )
        })
}

/// Network devices carrying IP configuration of `port`.
pub fn netdevs(config: &AdmConfig, port: u8) -> Result<Vec<String>, BfnetError> {
    check_port(port)?;
    let ib_dev = format!("mlx5_{}", port + NETDEV_IB_OFFSET);
    Ok(sorted_entries(&config.sysfs_net)?
        .into_iter()
        .filter(|name| {
            config
                .sysfs_net
                .join(name)
                .join("device")
                .join("infiniband")
                .join(&ib_dev)
                .exists()
        })
        .collect())
}

/// Uplink network device of `port` whose QoS is managed.
pub fn roce_device(config: &AdmConfig, port: u8) -> Result<String, BfnetError> {
    check_port(port)?;
    sorted_entries(&config.sysfs_net)?
        .into_iter()
        .filter(|name| {
            config.sysfs_net.join(name).join("smart_nic").join("pf").exists()
        })
        .nth(usize::from(port))
        .ok_or_else(|| {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("No RoCE network device found for port {port}"),
            )
        })
}

/// Resolve every device of `port`. An explicitly named `device` takes
/// precedence over the discovered one.
pub fn discover(
    config: &AdmConfig,
    port: u8,
    device: Option<&str>,
) -> Result<DeviceContext, BfnetError> {
    let device = match device {
        Some(d) => d.to_string(),
        None => netdevs(config, port)?.into_iter().next().ok_or_else(|| {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("No network device found for port {port}"),
            )
        })?,
    };
    let roce = roce_device(config, port)?;
    let pci = pci_device(config, port)?;
    log::debug!(
        "Port {port}: device {device}, RoCE device {roce}, PCI device {pci}"
    );
    Ok(DeviceContext::new(&device).with_roce(&roce, &pci))
}
