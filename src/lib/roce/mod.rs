// SPDX-License-Identifier: Apache-2.0

mod decode;
mod encode;
mod report;

pub(crate) use self::decode::QosSection;
pub use self::decode::{
    parse_ecn_flag, parse_qos_report, parse_roce_accl, QosScanner,
};
pub use self::encode::{
    build_accl_query_command, build_accl_set_command, build_ecn_read_command,
    build_ecn_write_commands, build_qos_command, build_qos_query_command,
    Dscp2PrioAction, Dscp2PrioChange, RoceQosIntent, RoceType,
};
pub use self::report::{
    RoceAcclField, RoceQosReport, Trust, DSCP_MAX, PRIORITY_COUNT,
};
