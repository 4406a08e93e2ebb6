// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Stdio};

use crate::{AdmConfig, BfnetError, ErrorKind};

/// Exit code reported when the program could not be started at all, same
/// as a shell reports for command not found.
pub const EXIT_CODE_NOT_FOUND: i32 = 127;

/// One external tool invocation: program plus argument list, never a shell
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Data fed to the standard input of the program.
    pub stdin: Option<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and combined stdout/stderr of a finished tool.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub output: String,
}

impl ToolOutput {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convert non-zero exit into [BfnetError] of specified kind, carrying
    /// exit code and raw output.
    pub fn check(
        self,
        kind: ErrorKind,
        what: &str,
    ) -> Result<String, BfnetError> {
        if self.is_success() {
            Ok(self.output)
        } else {
            Err(BfnetError::new_with_exit_code(
                kind,
                format!(
                    "Failed to {what}. RC={}\nOutput:\n{}",
                    self.exit_code,
                    self.output.trim()
                ),
                self.exit_code,
            ))
        }
    }
}

pub trait ToolRunner {
    /// Run the command to completion. Non-zero exit is not an error.
    fn run(&self, cmd: &ToolCommand) -> ToolOutput;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, cmd: &ToolCommand) -> ToolOutput {
        (**self).run(cmd)
    }
}

/// [ToolRunner] spawning real processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    search_path: String,
}

impl SystemRunner {
    pub fn new(config: &AdmConfig) -> Self {
        Self {
            search_path: config.tool_search_path.clone(),
        }
    }

    fn spawn_and_wait(
        &self,
        cmd: &ToolCommand,
    ) -> Result<ToolOutput, std::io::Error> {
        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .env("PATH", &self.search_path)
            .env_remove("LANG")
            .env_remove("LC_ALL")
            .stdin(if cmd.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(data) = cmd.stdin.as_ref() {
            if let Some(mut fd) = child.stdin.take() {
                fd.write_all(data.as_bytes())?;
            }
        }

        let output = child.wait_with_output()?;
        let exit_code = output
            .status
            .code()
            .or_else(|| output.status.signal().map(|s| 128 + s))
            .unwrap_or(1);
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(ToolOutput::new(exit_code, combined))
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, cmd: &ToolCommand) -> ToolOutput {
        log::debug!("Running command: {cmd}");
        let result = match self.spawn_and_wait(cmd) {
            Ok(o) => o,
            Err(e) => ToolOutput::new(
                EXIT_CODE_NOT_FOUND,
                format!("Failed to execute {}: {e}", cmd.program),
            ),
        };
        if result.is_success() {
            log::trace!("Output of {cmd}:\n{}", result.output);
        } else {
            log::warn!(
                "Running {cmd} failed (error[{}]): {}",
                result.exit_code,
                result.output.trim()
            );
        }
        result
    }
}
