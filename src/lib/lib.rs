// SPDX-License-Identifier: Apache-2.0

mod admin;
mod backup;
mod config;
mod deserializer;
pub mod discovery;
mod error;
mod exec;
pub mod ip;
mod iproute;
mod logging;
mod netplan;
mod request;
mod resolver;
pub mod roce;
mod result;


pub use self::admin::NetworkAdmin;
pub use self::backup::{BackupChain, RecoveryOutcome};
pub use self::config::{AdmConfig, ApplyMode, ConfigBackend};
pub use self::error::{BfnetError, ErrorKind};
pub use self::exec::{
    SystemRunner, ToolCommand, ToolOutput, ToolRunner, EXIT_CODE_NOT_FOUND,
};
pub use self::ip::IpVersion;
pub use self::iproute::runtime_commands;
pub use self::logging::{LogLevel, LOG_TARGETS};
pub use self::netplan::{
    GatewayConfigView, InterfaceConfig, IpConfigView, NetworkDocument,
    RouteEntry,
};
pub use self::request::{
    Action, AddrIntent, DeviceContext, DomainPatch, GatewayPatch, IpPatch,
    Operation, SetRequest,
};
pub use self::resolver::{NameserverUpdate, ResolverConfig, SearchUpdate};
pub use self::result::OperationResult;
pub use self::roce::{
    Dscp2PrioAction, Dscp2PrioChange, RoceAcclField, RoceQosIntent,
    RoceQosReport, RoceType, Trust,
};
