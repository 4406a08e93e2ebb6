// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use regex::Regex;

use crate::{
    roce::report::{DSCP_MAX, PRIORITY_COUNT},
    BfnetError, ErrorKind, RoceAcclField, RoceQosReport, Trust,
};

const TRUST_MARKER: &str = "Priority trust state:";
const CABLE_LEN_MARKER: &str = "Cable len:";
const BUFFER_SIZE_MARKER: &str = "Receive buffer size";
const PFC_MARKER: &str = "PFC configuration:";
const TC_MARKER: &str = "tc:";
const DSCP_MARKER: &str = "dscp2prio mapping:";
const DEFAULT_PRIO_MARKER: &str = "default priority:";
const PRIORITY_MARKER: &str = "priority:";

const TC_LINE_PATTERN: &str = r"tc:(.*?)ratelimit:(.*?)tsa:(.*?)$";

/// Block of the QoS report the scanner is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum QosSection {
    #[default]
    None,
    InPfc,
    InDscp,
}

/// Line oriented decoder of the QoS tool report.
///
/// Unrecognized lines and malformed values are skipped, so a partial
/// report still yields the fields that could be decoded.
#[derive(Debug)]
pub struct QosScanner {
    section: QosSection,
    tc_line: Regex,
    current_tc: Option<u8>,
    report: RoceQosReport,
}

impl QosScanner {
    pub fn new() -> Result<Self, BfnetError> {
        let tc_line = Regex::new(TC_LINE_PATTERN).map_err(|e| {
            BfnetError::new(
                ErrorKind::Bug,
                format!("Invalid traffic class pattern: {e}"),
            )
        })?;
        Ok(Self {
            section: QosSection::None,
            tc_line,
            current_tc: None,
            report: RoceQosReport::default(),
        })
    }

    pub(crate) fn section(&self) -> QosSection {
        self.section
    }

    pub fn feed_line(&mut self, line: &str) {
        if let Some(value) = value_after(line, TRUST_MARKER) {
            match value.parse::<Trust>() {
                Ok(t) => self.report.trust = Some(t),
                Err(_) => log::debug!("Ignoring unknown trust state {value}"),
            }
        } else if let Some(value) = value_after(line, CABLE_LEN_MARKER) {
            self.report.cable_len = value.parse().ok();
        } else if line.contains(BUFFER_SIZE_MARKER) {
            self.report.buffer_size = line
                .rsplit_once(':')
                .map(|(_, v)| parse_numbers(v))
                .unwrap_or_default();
        } else if line.contains(PFC_MARKER) {
            self.section = QosSection::InPfc;
            self.report.pfc_enabled.get_or_insert_with(BTreeSet::new);
        } else if line.contains(TC_MARKER) {
            self.section = QosSection::None;
            self.feed_tc_line(line);
        } else if line.contains(DSCP_MARKER) {
            self.section = QosSection::InDscp;
        } else if line.contains(DEFAULT_PRIO_MARKER) {
            self.section = QosSection::None;
        } else if self.section == QosSection::InPfc {
            self.feed_pfc_line(line);
        } else if self.section == QosSection::InDscp {
            self.feed_dscp_line(line);
        } else if let Some(value) = value_after(line, PRIORITY_MARKER) {
            if let Some(tc) = self.current_tc {
                for prio in parse_numbers::<u8>(value)
                    .into_iter()
                    .filter(|p| *p < PRIORITY_COUNT)
                {
                    self.report.prio_tc.insert(prio, tc);
                }
            }
        }
    }

    pub fn finish(self) -> RoceQosReport {
        self.report
    }

    fn feed_tc_line(&mut self, line: &str) {
        let Some(caps) = self.tc_line.captures(line) else {
            log::debug!("Ignoring malformed traffic class line {line}");
            self.current_tc = None;
            return;
        };
        let tc = caps.get(1).and_then(|m| m.as_str().trim().parse::<u8>().ok());
        let rate = caps
            .get(2)
            .map(|m| m.as_str().trim().trim_end_matches(',').trim())
            .unwrap_or_default();
        self.current_tc = tc;
        if let Some(tc) = tc {
            let index = usize::from(tc);
            if self.report.ratelimit.len() <= index {
                self.report.ratelimit.resize(index + 1, String::new());
            }
            self.report.ratelimit[index] = rate.to_string();
        }
    }

    //  enabled     0   0   0   1   0   0   0   0
    fn feed_pfc_line(&mut self, line: &str) {
        let line = line.trim();
        let Some((key, values)) = line.split_once(char::is_whitespace) else {
            return;
        };
        let flags = parse_numbers::<u8>(values);
        if key.contains("enabled") {
            let enabled = flags
                .iter()
                .enumerate()
                .filter(|(_, f)| **f != 0)
                .filter_map(|(p, _)| u8::try_from(p).ok())
                .filter(|p| *p < PRIORITY_COUNT)
                .collect();
            self.report.pfc_enabled = Some(enabled);
        } else if key.contains("buffer") {
            self.report.prio2buffer = flags
                .into_iter()
                .enumerate()
                .filter_map(|(p, b)| u8::try_from(p).ok().map(|p| (p, b)))
                .filter(|(p, _)| *p < PRIORITY_COUNT)
                .collect();
        }
    }

    // prio:0 dscp:07,06,05,04,03,02,01,00,
    fn feed_dscp_line(&mut self, line: &str) {
        let Some(prio) = value_after(line, "prio:").and_then(|v| {
            v.split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|d| d.parse::<u8>().ok())
        }) else {
            return;
        };
        if prio >= PRIORITY_COUNT {
            return;
        }
        let Some(codepoints) = value_after(line, "dscp:") else {
            return;
        };
        for dscp in parse_numbers::<u8>(codepoints)
            .into_iter()
            .filter(|d| *d <= DSCP_MAX)
        {
            self.report.map_dscp(prio, dscp);
        }
    }
}

/// Decode the full text printed by the QoS query tool.
pub fn parse_qos_report(text: &str) -> Result<RoceQosReport, BfnetError> {
    let mut scanner = QosScanner::new()?;
    for line in text.lines() {
        scanner.feed_line(line);
    }
    Ok(scanner.finish())
}

/// Decode register dump lines like
/// `roce_adp_retrans_en            | 0x00000001`.
pub fn parse_roce_accl(text: &str) -> Vec<RoceAcclField> {
    text.lines()
        .filter(|l| l.contains("roce"))
        .filter_map(|l| {
            let mut fields = l.split('|');
            let name = fields.next()?.trim();
            let value = fields.next()?.trim();
            if name.is_empty() || value.is_empty() {
                None
            } else {
                Some(RoceAcclField::new(name, value))
            }
        })
        .collect()
}

/// An ECN sysfs knob reads `1` when enabled.
pub fn parse_ecn_flag(text: &str) -> bool {
    text.trim() == "1"
}

fn value_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker)
        .map(|i| line[i + marker.len()..].trim())
}

fn parse_numbers<T: std::str::FromStr>(text: &str) -> Vec<T> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<T>().ok())
        .collect()
}
