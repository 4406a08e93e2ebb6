// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Please report this as bug to upstream
    Bug,
    /// Unsupported operation, action or missing device context
    InvalidArgument,
    /// Network configuration document missing or not parseable
    ConfigLoadError,
    /// Failed to write configuration document
    ConfigWriteError,
    /// The declarative apply tool rejected the written document
    ApplyError,
    /// External tool exited with non-zero status
    ToolInvocationError,
    /// Both rollback tiers failed
    RecoveryFailure,
    /// Permission deny
    PermissionDeny,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::InvalidArgument => "invalid-argument",
            Self::ConfigLoadError => "config-load-error",
            Self::ConfigWriteError => "config-write-error",
            Self::ApplyError => "apply-error",
            Self::ToolInvocationError => "tool-invocation-error",
            Self::RecoveryFailure => "recovery-failure",
            Self::PermissionDeny => "permission-deny",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Try not implement From for BfnetError here unless you are sure this
// error should always convert to certain type of ErrorKind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct BfnetError {
    pub kind: ErrorKind,
    pub msg: String,
    /// Exit code of the external tool which caused this error
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exit_code: Option<i32>,
}

impl std::fmt::Display for BfnetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl BfnetError {
    pub fn new(kind: ErrorKind, msg: String) -> Self {
        Self {
            kind,
            msg,
            exit_code: None,
        }
    }

    pub fn new_with_exit_code(
        kind: ErrorKind,
        msg: String,
        exit_code: i32,
    ) -> Self {
        Self {
            kind,
            msg,
            exit_code: Some(exit_code),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        self.msg.as_str()
    }

    /// Process status to report for this error: the exit code of the
    /// failing tool when known, otherwise 1.
    pub fn status(&self) -> i32 {
        match self.exit_code {
            Some(0) | None => 1,
            Some(c) => c,
        }
    }
}

impl std::error::Error for BfnetError {}

impl From<serde_json::Error> for BfnetError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::Bug, format!("serde_json::Error: {e}"))
    }
}

impl From<serde_yaml::Error> for BfnetError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::new(ErrorKind::Bug, format!("serde_yaml::Error: {e}"))
    }
}

impl From<std::io::Error> for BfnetError {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::Bug, format!("std::io::Error: {e}"))
    }
}

impl From<std::net::AddrParseError> for BfnetError {
    fn from(e: std::net::AddrParseError) -> Self {
        Self::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IP address: {e}"),
        )
    }
}
