// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{Action, BfnetError, Operation, RoceQosReport, RouteEntry};

/// Outcome of one invocation as reported to the management agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct OperationResult {
    pub op: Operation,
    pub action: Action,
    /// 0 on success, otherwise exit code of the failed step
    pub status: i32,
    /// `key=value/key=value` text on show, error text on failure
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<RouteEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roce: Option<RoceQosReport>,
}

impl OperationResult {
    pub fn new(op: Operation, action: Action) -> Self {
        Self {
            op,
            action,
            status: 0,
            output: String::new(),
            routes: None,
            roce: None,
        }
    }

    pub(crate) fn set_error(&mut self, error: &BfnetError) {
        self.status = error.status();
        self.output = format!("ERR: {}", error.msg());
    }

    pub fn to_json(&self) -> Result<String, BfnetError> {
        Ok(serde_json::to_string(self)?)
    }
}
