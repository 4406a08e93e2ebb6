// SPDX-License-Identifier: Apache-2.0

use bfnetadm::{discovery, AdmConfig, NetworkAdmin, Operation, SystemRunner};

use crate::{
    args::{get_device_context, get_port, get_set_request},
    CliError,
};

/// Print the result record of `op` as JSON, return its status.
pub(crate) fn handle_show(
    admin: &NetworkAdmin<SystemRunner>,
    op: Operation,
    matches: &clap::ArgMatches,
) -> Result<i32, CliError> {
    let ctx = if op.needs_device() {
        get_device_context(admin.config(), matches)?
    } else {
        Default::default()
    };
    let result = admin.show(op, &ctx);
    println!("{}", result.to_json()?);
    Ok(result.status)
}

pub(crate) fn handle_set(
    admin: &NetworkAdmin<SystemRunner>,
    op: Operation,
    matches: &clap::ArgMatches,
) -> Result<i32, CliError> {
    let request = get_set_request(op, matches)?;
    let ctx = if op.needs_device() {
        get_device_context(admin.config(), matches)?
    } else {
        Default::default()
    };
    admin.set(&ctx, &request)?;
    Ok(0)
}

/// Print network devices of `--port`, or of every port when unset.
pub(crate) fn handle_get_devices(
    config: &AdmConfig,
    matches: &clap::ArgMatches,
) -> Result<i32, CliError> {
    let ports = match get_port(matches) {
        Some(port) => vec![port],
        None => discovery::PORTS.to_vec(),
    };
    let mut devices = Vec::new();
    for port in ports {
        devices.extend(discovery::netdevs(config, port)?);
    }
    println!("{}", serde_json::to_string(&devices)?);
    Ok(0)
}
