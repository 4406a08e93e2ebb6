// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    roce::report::{DSCP_MAX, PRIORITY_COUNT},
    BfnetError, ErrorKind, RoceAcclField, ToolCommand, Trust,
};

const ACCL_REGISTER: &str = "ROCE_ACCL";
const ACCL_TYPE_FIELDS: [&str; 3] = [
    "roce_adp_retrans_en",
    "roce_tx_window_en",
    "roce_slow_restart_en",
];
const MAX_TRAFFIC_CLASS: u8 = 7;
const MAX_BUFFER: u8 = 7;

/// Profile of the RoCE acceleration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoceType {
    Lossy,
    Lossless,
}

impl RoceType {
    /// Register fields written for this profile, lossy enables adaptive
    /// retransmission, TX window and slow restart.
    pub fn accl_fields(&self) -> Vec<RoceAcclField> {
        let value = match self {
            Self::Lossy => "0x1",
            Self::Lossless => "0x0",
        };
        ACCL_TYPE_FIELDS
            .iter()
            .map(|name| RoceAcclField::new(name, value))
            .collect()
    }
}

impl std::str::FromStr for RoceType {
    type Err = BfnetError;

    fn from_str(s: &str) -> Result<Self, BfnetError> {
        match s {
            "lossy" => Ok(Self::Lossy),
            "lossless" => Ok(Self::Lossless),
            _ => Err(BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid RoCE type {s}, should be lossy or lossless"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dscp2PrioAction {
    Set,
    Del,
}

/// `set,<dscp>,<prio>` or `del,<dscp>,<prio>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Dscp2PrioChange {
    pub action: Dscp2PrioAction,
    pub dscp: u8,
    pub prio: u8,
}

impl Dscp2PrioChange {
    pub fn new(action: Dscp2PrioAction, dscp: u8, prio: u8) -> Self {
        Self { action, dscp, prio }
    }
}

impl std::fmt::Display for Dscp2PrioChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self.action {
            Dscp2PrioAction::Set => "set",
            Dscp2PrioAction::Del => "del",
        };
        write!(f, "{action},{},{}", self.dscp, self.prio)
    }
}

impl std::str::FromStr for Dscp2PrioChange {
    type Err = BfnetError;

    fn from_str(s: &str) -> Result<Self, BfnetError> {
        let invalid = || {
            BfnetError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Invalid dscp2prio '{s}', expecting \
                     set,<dscp>,<prio> or del,<dscp>,<prio>"
                ),
            )
        };
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        let [action, dscp, prio] = fields.as_slice() else {
            return Err(invalid());
        };
        let action = match *action {
            "set" => Dscp2PrioAction::Set,
            "del" => Dscp2PrioAction::Del,
            _ => return Err(invalid()),
        };
        let dscp = dscp.parse::<u8>().map_err(|_| invalid())?;
        let prio = prio.parse::<u8>().map_err(|_| invalid())?;
        if dscp > DSCP_MAX || prio >= PRIORITY_COUNT {
            return Err(invalid());
        }
        Ok(Self::new(action, dscp, prio))
    }
}

/// Desired QoS change of a RoCE device. Empty lists and `None` leave the
/// matching setting untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
#[non_exhaustive]
pub struct RoceQosIntent {
    pub roce_type: Option<RoceType>,
    pub trust: Option<Trust>,
    /// ECN enablement per priority, index is the priority
    pub ecn: Vec<bool>,
    pub cable_len: Option<u32>,
    pub dscp2prio: Option<Dscp2PrioChange>,
    /// Traffic class per priority
    pub prio_tc: Vec<u8>,
    /// PFC enablement per priority
    pub pfc: Vec<bool>,
    /// Receive buffer per priority
    pub prio2buffer: Vec<u8>,
    /// Rate limit in Gbps per traffic class
    pub ratelimit: Vec<String>,
    pub buffer_size: Vec<u32>,
    /// Raw register fields written after `roce_type`
    pub roce_accl: Vec<RoceAcclField>,
}

impl RoceQosIntent {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn validate(&self) -> Result<(), BfnetError> {
        check_len("ecn", self.ecn.len())?;
        check_len("prio_tc", self.prio_tc.len())?;
        check_len("pfc", self.pfc.len())?;
        check_len("prio2buffer", self.prio2buffer.len())?;
        check_len("ratelimit", self.ratelimit.len())?;
        if let Some(tc) = self.prio_tc.iter().find(|tc| **tc > MAX_TRAFFIC_CLASS)
        {
            return Err(BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid traffic class {tc}, should be 0-{MAX_TRAFFIC_CLASS}"),
            ));
        }
        if let Some(b) = self.prio2buffer.iter().find(|b| **b > MAX_BUFFER) {
            return Err(BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid receive buffer {b}, should be 0-{MAX_BUFFER}"),
            ));
        }
        if let Some(r) = self
            .ratelimit
            .iter()
            .find(|r| r.trim().parse::<f64>().map(|v| v < 0.0).unwrap_or(true))
        {
            return Err(BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid rate limit '{r}', expecting Gbps"),
            ));
        }
        Ok(())
    }
}

fn check_len(name: &str, len: usize) -> Result<(), BfnetError> {
    if len > usize::from(PRIORITY_COUNT) {
        Err(BfnetError::new(
            ErrorKind::InvalidArgument,
            format!("Too many {name} values {len}, at most {PRIORITY_COUNT}"),
        ))
    } else {
        Ok(())
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn join_flags(values: &[bool]) -> String {
    values
        .iter()
        .map(|v| if *v { "1" } else { "0" })
        .collect::<Vec<_>>()
        .join(",")
}

pub fn build_qos_query_command(qos_tool: &str, device: &str) -> ToolCommand {
    ToolCommand::new(qos_tool).args(["-i", device])
}

/// Single QoS tool invocation carrying every requested QoS setting, `None`
/// when the intent holds no QoS setting.
pub fn build_qos_command(
    qos_tool: &str,
    device: &str,
    intent: &RoceQosIntent,
) -> Option<ToolCommand> {
    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(trust) = intent.trust {
        params.push(("--trust", trust.to_string()));
    }
    if let Some(cable_len) = intent.cable_len {
        params.push(("--cable_len", cable_len.to_string()));
    }
    if let Some(change) = intent.dscp2prio {
        params.push(("--dscp2prio", change.to_string()));
    }
    if !intent.prio_tc.is_empty() {
        params.push(("--prio_tc", join(&intent.prio_tc)));
    }
    if !intent.pfc.is_empty() {
        params.push(("--pfc", join_flags(&intent.pfc)));
    }
    if !intent.prio2buffer.is_empty() {
        params.push(("--prio2buffer", join(&intent.prio2buffer)));
    }
    if !intent.ratelimit.is_empty() {
        params.push(("--ratelimit", intent.ratelimit.join(",")));
    }
    if !intent.buffer_size.is_empty() {
        params.push(("--buffer_size", join(&intent.buffer_size)));
    }
    if params.is_empty() {
        return None;
    }
    let mut cmd = build_qos_query_command(qos_tool, device);
    for (flag, value) in params {
        cmd = cmd.arg(flag).arg(value);
    }
    Some(cmd)
}

fn ecn_knob(sysfs_net: &Path, device: &str, point: &str, prio: u8) -> String {
    sysfs_net
        .join(device)
        .join("ecn")
        .join(point)
        .join("enable")
        .join(prio.to_string())
        .display()
        .to_string()
}

pub fn build_ecn_read_command(
    cat_tool: &str,
    sysfs_net: &Path,
    device: &str,
    prio: u8,
) -> ToolCommand {
    ToolCommand::new(cat_tool).arg(ecn_knob(sysfs_net, device, "roce_np", prio))
}

/// One write per priority, updating both notification and reaction
/// points.
pub fn build_ecn_write_commands(
    tee_tool: &str,
    sysfs_net: &Path,
    device: &str,
    ecn: &[bool],
) -> Vec<ToolCommand> {
    ecn.iter()
        .zip(0..PRIORITY_COUNT)
        .map(|(enabled, prio)| {
            ToolCommand::new(tee_tool)
                .arg(ecn_knob(sysfs_net, device, "roce_np", prio))
                .arg(ecn_knob(sysfs_net, device, "roce_rp", prio))
                .stdin(if *enabled { "1\n" } else { "0\n" })
        })
        .collect()
}

pub fn build_accl_query_command(
    mlxreg_tool: &Path,
    pci_device: &str,
) -> ToolCommand {
    ToolCommand::new(mlxreg_tool.display().to_string()).args([
        "-d",
        pci_device,
        "--get",
        "--reg_name",
        ACCL_REGISTER,
    ])
}

/// `None` when `fields` is empty.
pub fn build_accl_set_command(
    mlxreg_tool: &Path,
    pci_device: &str,
    fields: &[RoceAcclField],
) -> Option<ToolCommand> {
    if fields.is_empty() {
        return None;
    }
    Some(
        ToolCommand::new(mlxreg_tool.display().to_string())
            .args(["-d", pci_device, "--yes", "--reg_name", ACCL_REGISTER])
            .arg("--set")
            .arg(join(fields)),
    )
}
