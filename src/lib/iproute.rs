// SPDX-License-Identifier: Apache-2.0

use crate::{
    ip::{sanitize_ip_network, split_cidr, to_cidr},
    AddrIntent, BfnetError, DomainPatch, ErrorKind, GatewayPatch, IpVersion,
    ToolCommand,
};

/// `ip` invocations making `patch` effective on the running system only.
pub fn runtime_commands(
    ip_tool: &str,
    device: &str,
    patch: &DomainPatch,
) -> Result<Vec<ToolCommand>, BfnetError> {
    match patch {
        DomainPatch::Ip(p) => {
            let mut cmds = Vec::new();
            for intent in [p.ipv4.as_ref(), p.ipv6.as_ref()].into_iter().flatten()
            {
                match intent {
                    AddrIntent::Static(cidr) => cmds.push(
                        ToolCommand::new(ip_tool)
                            .args(["address", "add", "dev", device])
                            .arg(cidr.as_str()),
                    ),
                    AddrIntent::Dhcp => {
                        return Err(BfnetError::new(
                            ErrorKind::InvalidArgument,
                            "DHCP is only supported with persistent apply mode"
                                .to_string(),
                        ));
                    }
                }
            }
            Ok(cmds)
        }
        DomainPatch::Mtu(Some(mtu)) => Ok(vec![ToolCommand::new(ip_tool)
            .args(["link", "set", device, "mtu"])
            .arg(mtu.to_string())]),
        DomainPatch::Mtu(None) => Ok(Vec::new()),
        DomainPatch::Gateway(p) => gateway_commands(ip_tool, device, p),
    }
}

fn gateway_commands(
    ip_tool: &str,
    device: &str,
    patch: &GatewayPatch,
) -> Result<Vec<ToolCommand>, BfnetError> {
    patch.validate()?;
    let network = match patch.route_network() {
        Some(network) => Some(sanitize_ip_network(&to_cidr(
            network,
            patch.network_prefix.as_deref(),
        )?)?),
        None => None,
    };
    let mut cmds = Vec::new();
    for (gateway, version) in [
        (patch.ipv4_gateway.as_deref(), IpVersion::V4),
        (patch.ipv6_gateway.as_deref(), IpVersion::V6),
    ] {
        let Some(gateway) = gateway else {
            continue;
        };
        let destination = match network.as_deref() {
            Some(n) if IpVersion::classify(split_cidr(n).0) == version => {
                n.to_string()
            }
            Some(n) => {
                return Err(BfnetError::new(
                    ErrorKind::InvalidArgument,
                    format!("Network {n} does not match {version} gateway"),
                ));
            }
            None => "default".to_string(),
        };
        let mut cmd = ToolCommand::new(ip_tool)
            .args(["route", "add"])
            .arg(destination)
            .args(["via", gateway, "dev", device]);
        if let Some(metric) = patch.metric {
            cmd = cmd.arg("metric").arg(metric.to_string());
        }
        cmds.push(cmd);
    }
    Ok(cmds)
}
