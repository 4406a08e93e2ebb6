// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use bfnetadm::{
    discovery, AddrIntent, AdmConfig, BfnetError, DeviceContext,
    Dscp2PrioChange, GatewayPatch, IpPatch, IpVersion, NameserverUpdate,
    Operation, RoceAcclField, RoceQosIntent, RoceType, SearchUpdate,
    SetRequest, Trust,
};

use crate::CliError;

const LIST_ARGS: [(&str, &str); 10] = [
    ("ipv4_nameservers", "IPv4 nameservers"),
    ("ipv6_nameservers", "IPv6 nameservers"),
    ("domains", "Search domains"),
    ("ecn", "ECN enablement per priority, 0 or 1"),
    ("pfc", "PFC enablement per priority, 0 or 1"),
    ("prio_tc", "Traffic class per priority"),
    ("prio2buffer", "Receive buffer per priority"),
    ("ratelimit", "Rate limit in Gbps per traffic class"),
    ("buffer_size", "Receive buffer sizes in bytes"),
    ("roce_accl", "ROCE_ACCL register fields as field=value"),
];

const VALUE_ARGS: [(&str, &str); 16] = [
    ("device", "Network device, overrides the one discovered from --port"),
    ("ipv4_addr", "IPv4 address or 'dhcp'"),
    ("ipv4_prefix", "IPv4 prefix length or netmask"),
    ("ipv6_addr", "IPv6 address or 'dhcp'"),
    ("ipv6_prefix", "IPv6 prefix length"),
    ("network", "Destination network of the route, default route if unset"),
    ("network_prefix", "Prefix length or netmask of --network"),
    ("ipv4_gateway", "IPv4 gateway"),
    ("ipv6_gateway", "IPv6 gateway"),
    ("metric", "Route metric"),
    ("mtu", "MTU, unset to remove"),
    ("type", "RoCE type: lossy or lossless"),
    ("trust", "Priority trust state: pcp or dscp"),
    ("dscp2prio", "DSCP mapping change: set|del,<dscp>,<prio>"),
    ("cable_len", "Cable length in meters"),
    ("config", "Path of bfnetadm configuration file"),
];

/// Flags of a single `--op`/`--action` invocation.
pub(crate) fn gen_args(cmd: clap::Command) -> clap::Command {
    let mut cmd = cmd
        .arg(
            clap::Arg::new("op")
                .long("op")
                .value_parser(Operation::ALL.map(|o| o.as_str()))
                .help("Operation"),
        )
        .arg(
            clap::Arg::new("action")
                .long("action")
                .value_parser(["show", "set"])
                .default_value("show")
                .help("Action of operation"),
        )
        .arg(
            clap::Arg::new("port")
                .long("port")
                .value_parser(clap::value_parser!(u8).range(0..=1))
                .help("Port number: 0 or 1"),
        )
        .arg(
            clap::Arg::new("get_devices")
                .long("get_devices")
                .action(clap::ArgAction::SetTrue)
                .help("Print network devices of port"),
        );
    for (name, help) in VALUE_ARGS {
        cmd = cmd.arg(
            clap::Arg::new(name).long(name).num_args(1).help(help),
        );
    }
    for (name, help) in LIST_ARGS {
        cmd = cmd.arg(
            clap::Arg::new(name)
                .long(name)
                .num_args(1)
                .action(clap::ArgAction::Append)
                .help(format!("{help}, comma separated or repeated")),
        );
    }
    cmd
}

fn get_str<'a>(matches: &'a clap::ArgMatches, id: &str) -> Option<&'a str> {
    matches
        .get_one::<String>(id)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn get_parsed<T>(
    matches: &clap::ArgMatches,
    id: &str,
) -> Result<Option<T>, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_str(matches, id) {
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| CliError::from(format!("Invalid --{id} '{s}': {e}"))),
        None => Ok(None),
    }
}

/// Values of a list flag, accepting both repeated flags and comma separated
/// values.
pub(crate) fn get_list(matches: &clap::ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| {
            values
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn get_parsed_list<T>(
    matches: &clap::ArgMatches,
    id: &str,
) -> Result<Vec<T>, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_list(matches, id)
        .iter()
        .map(|v| {
            v.parse::<T>().map_err(|e| {
                CliError::from(format!("Invalid --{id} value '{v}': {e}"))
            })
        })
        .collect()
}

fn get_flag_list(
    matches: &clap::ArgMatches,
    id: &str,
) -> Result<Vec<bool>, CliError> {
    get_list(matches, id)
        .iter()
        .map(|v| match v.as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(CliError::from(format!(
                "Invalid --{id} value '{v}', should be 0 or 1"
            ))),
        })
        .collect()
}

pub(crate) fn get_operation(
    matches: &clap::ArgMatches,
) -> Result<Option<Operation>, CliError> {
    get_parsed::<Operation>(matches, "op")
}

pub(crate) fn get_port(matches: &clap::ArgMatches) -> Option<u8> {
    matches.get_one::<u8>("port").copied()
}

/// Resolve devices from `--port`, `--device` alone is taken as is.
pub(crate) fn get_device_context(
    config: &AdmConfig,
    matches: &clap::ArgMatches,
) -> Result<DeviceContext, BfnetError> {
    let device = get_str(matches, "device");
    match get_port(matches) {
        Some(port) => discovery::discover(config, port, device),
        None => Ok(device.map(DeviceContext::new).unwrap_or_default()),
    }
}

fn get_addr(
    matches: &clap::ArgMatches,
    addr_id: &str,
    prefix_id: &str,
    version: IpVersion,
) -> Result<Option<AddrIntent>, CliError> {
    Ok(match get_str(matches, addr_id) {
        Some(addr) => Some(AddrIntent::parse(
            addr,
            get_str(matches, prefix_id),
            version,
        )?),
        None => None,
    })
}

fn get_roce_intent(
    matches: &clap::ArgMatches,
) -> Result<RoceQosIntent, CliError> {
    let mut intent = RoceQosIntent::default();
    intent.roce_type = get_parsed::<RoceType>(matches, "type")?;
    intent.trust = get_parsed::<Trust>(matches, "trust")?;
    intent.ecn = get_flag_list(matches, "ecn")?;
    intent.cable_len = get_parsed::<u32>(matches, "cable_len")?;
    intent.dscp2prio = get_parsed::<Dscp2PrioChange>(matches, "dscp2prio")?;
    intent.prio_tc = get_parsed_list::<u8>(matches, "prio_tc")?;
    intent.pfc = get_flag_list(matches, "pfc")?;
    intent.prio2buffer = get_parsed_list::<u8>(matches, "prio2buffer")?;
    intent.ratelimit = get_list(matches, "ratelimit");
    intent.buffer_size = get_parsed_list::<u32>(matches, "buffer_size")?;
    intent.roce_accl = get_parsed_list::<RoceAcclField>(matches, "roce_accl")?;
    Ok(intent)
}

/// Translate flags of `op` into the change to apply.
pub(crate) fn get_set_request(
    op: Operation,
    matches: &clap::ArgMatches,
) -> Result<SetRequest, CliError> {
    Ok(match op {
        Operation::IpConfig => SetRequest::Ip(IpPatch::new(
            get_addr(matches, "ipv4_addr", "ipv4_prefix", IpVersion::V4)?,
            get_addr(matches, "ipv6_addr", "ipv6_prefix", IpVersion::V6)?,
        )),
        Operation::MtuConfig => {
            SetRequest::Mtu(get_parsed::<u32>(matches, "mtu")?)
        }
        Operation::GwConfig => SetRequest::Gateway(
            GatewayPatch::new(
                get_str(matches, "ipv4_gateway").map(ToString::to_string),
                get_str(matches, "ipv6_gateway").map(ToString::to_string),
            )
            .with_route(
                get_str(matches, "network").map(ToString::to_string),
                get_str(matches, "network_prefix").map(ToString::to_string),
                get_parsed::<u32>(matches, "metric")?,
            ),
        ),
        Operation::DnsConfig => SetRequest::Dns(NameserverUpdate::new(
            get_list(matches, "ipv4_nameservers"),
            get_list(matches, "ipv6_nameservers"),
        )),
        Operation::DomainConfig => {
            SetRequest::Domain(SearchUpdate::from_domains(get_list(
                matches, "domains",
            )))
        }
        Operation::RoceConfig => SetRequest::Roce(get_roce_intent(matches)?),
        _ => {
            return Err(CliError::from(format!(
                "Operation {op} does not support set"
            )))
        }
    })
}
