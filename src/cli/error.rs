// SPDX-License-Identifier: Apache-2.0

use bfnetadm::{BfnetError, ErrorKind};

#[derive(Clone, Debug)]
pub(crate) struct CliError {
    msg: String,
    status: i32,
}

impl CliError {
    /// Process exit code reported for this error.
    pub(crate) fn status(&self) -> i32 {
        self.status
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for CliError {}

impl From<BfnetError> for CliError {
    fn from(e: BfnetError) -> Self {
        Self {
            status: e.status(),
            msg: format!("BfnetError: {e}"),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            msg: format!("serde_json::Error: {e}"),
            status: 1,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self {
            msg: format!("std::io::Error: {e}"),
            status: 1,
        }
    }
}

impl From<clap::Error> for CliError {
    fn from(e: clap::Error) -> Self {
        Self {
            msg: format!("Invalid argument: {e}"),
            status: 1,
        }
    }
}

impl From<&str> for CliError {
    fn from(msg: &str) -> Self {
        Self {
            msg: msg.to_string(),
            status: 1,
        }
    }
}

impl From<String> for CliError {
    fn from(msg: String) -> Self {
        Self { msg, status: 1 }
    }
}

pub(crate) fn permission_deny(msg: &str) -> CliError {
    CliError::from(BfnetError::new(ErrorKind::PermissionDeny, msg.to_string()))
}
