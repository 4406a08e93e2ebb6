// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{BfnetError, ErrorKind};

/// Number of link priorities
pub const PRIORITY_COUNT: u8 = 8;
/// Largest DSCP codepoint
pub const DSCP_MAX: u8 = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trust {
    Pcp,
    Dscp,
}

impl Trust {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcp => "pcp",
            Self::Dscp => "dscp",
        }
    }
}

impl std::fmt::Display for Trust {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Trust {
    type Err = BfnetError;

    fn from_str(s: &str) -> Result<Self, BfnetError> {
        match s {
            "pcp" => Ok(Self::Pcp),
            "dscp" => Ok(Self::Dscp),
            _ => Err(BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid trust state {s}, should be pcp or dscp"),
            )),
        }
    }
}

/// One field of the RoCE acceleration register, e.g.
/// `roce_adp_retrans_en=0x00000001`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RoceAcclField {
    pub name: String,
    pub value: String,
}

impl RoceAcclField {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for RoceAcclField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

impl std::str::FromStr for RoceAcclField {
    type Err = BfnetError;

    fn from_str(s: &str) -> Result<Self, BfnetError> {
        match s.split_once('=') {
            Some((name, value))
                if !name.trim().is_empty() && !value.trim().is_empty() =>
            {
                Ok(Self::new(name.trim(), value.trim()))
            }
            _ => Err(BfnetError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid acceleration field '{s}', expecting field=value"),
            )),
        }
    }
}

/// QoS state of one RoCE device, rebuilt on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct RoceQosReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust: Option<Trust>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cable_len: Option<u32>,
    /// Size of each receive buffer in bytes
    pub buffer_size: Vec<u32>,
    /// Priority to traffic class
    pub prio_tc: BTreeMap<u8, u8>,
    /// Rate limit indexed by traffic class
    pub ratelimit: Vec<String>,
    /// `None` when the tool did not report PFC configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pfc_enabled: Option<BTreeSet<u8>>,
    /// Priority to receive buffer
    pub prio2buffer: BTreeMap<u8, u8>,
    /// Priority to DSCP codepoints, holding every priority
    pub dscp2prio: BTreeMap<u8, BTreeSet<u8>>,
    pub ecn_enabled: BTreeSet<u8>,
    pub roce_accl: Vec<RoceAcclField>,
}

impl Default for RoceQosReport {
    fn default() -> Self {
        Self {
            trust: None,
            cable_len: None,
            buffer_size: Vec::new(),
            prio_tc: BTreeMap::new(),
            ratelimit: Vec::new(),
            pfc_enabled: None,
            prio2buffer: BTreeMap::new(),
            dscp2prio: (0..PRIORITY_COUNT).map(|p| (p, BTreeSet::new())).collect(),
            ecn_enabled: BTreeSet::new(),
            roce_accl: Vec::new(),
        }
    }
}

impl RoceQosReport {
    /// Map `dscp` to `prio`, dropping it from any other priority.
    pub(crate) fn map_dscp(&mut self, prio: u8, dscp: u8) {
        for (p, codepoints) in self.dscp2prio.iter_mut() {
            if *p != prio {
                codepoints.remove(&dscp);
            }
        }
        self.dscp2prio.entry(prio).or_default().insert(dscp);
    }

    /// Render in the `key=value/key=value` layout expected by the
    /// management agent.
    pub fn to_show_output(&self) -> String {
        let flags = |set: &BTreeSet<u8>| {
            (0..PRIORITY_COUNT)
                .map(|p| if set.contains(&p) { "1" } else { "0" })
                .collect::<Vec<_>>()
                .join(",")
        };
        let join_map = |map: &BTreeMap<u8, u8>| {
            map.values().map(u8::to_string).collect::<Vec<_>>().join(",")
        };

        format!(
            "trust={}/prio_tc={}/ecn={}/pfc={}/cable_len={}/prio2buffer={}/\
             buffer_size={}/dscp2prio={}/ratelimit={}/roce_accl={}",
            self.trust.map(|t| t.to_string()).unwrap_or_default(),
            join_map(&self.prio_tc),
            flags(&self.ecn_enabled),
            self.pfc_enabled.as_ref().map(flags).unwrap_or_default(),
            self.cable_len.map(|c| c.to_string()).unwrap_or_default(),
            join_map(&self.prio2buffer),
            self.buffer_size
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(","),
            self.dscp2prio
                .values()
                .map(|codepoints| format!(
                    "{{{}}}",
                    codepoints
                        .iter()
                        .map(u8::to_string)
                        .collect::<Vec<_>>()
                        .join(",")
                ))
                .collect::<Vec<_>>()
                .join(","),
            self.ratelimit.join(","),
            self.roce_accl
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}
