//! External command wrapper
//!
//! A command is described by a list of interchangeable binaries (e.g.
//! `ffprobe` and its fork `avprobe`). The first one that can be spawned is
//! used; if none is installed the call fails with `ProbeUnavailable`.
//! Arguments go straight to `execve`, never through a shell.

use crate::error::{MediaError, Result};
use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ToolCommand {
    candidates: Vec<String>,
    args: Vec<OsString>,
    ok_codes: Vec<i32>,
}

/// Captured output of a finished tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// The candidate binary that actually ran
    pub binary: String,
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim_end().to_string()
    }
}

impl ToolCommand {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            args: Vec::new(),
            ok_codes: vec![0],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Append a file path argument.
    pub fn path(self, path: impl AsRef<Path>) -> Self {
        self.arg(path.as_ref().as_os_str())
    }

    /// Exit codes treated as success (default: only 0).
    pub fn ok_codes(mut self, codes: &[i32]) -> Self {
        self.ok_codes = codes.to_vec();
        self
    }

    pub fn execute(&self) -> Result<ToolOutput> {
        for binary in &self.candidates {
            let output = match Command::new(binary)
                .args(&self.args)
                .stdin(Stdio::null())
                .output()
            {
                Ok(output) => output,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("{} not found, trying next candidate", binary);
                    continue;
                }
                Err(e) => return Err(MediaError::Tool(e)),
            };

            let result = ToolOutput {
                binary: binary.clone(),
                status: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            };

            let accepted = result
                .status
                .map(|code| self.ok_codes.contains(&code))
                .unwrap_or(false);
            if !accepted {
                return Err(MediaError::MalformedInput(format!(
                    "{} exited with {:?}: {}",
                    binary,
                    result.status,
                    result.stderr_text()
                )));
            }
            return Ok(result);
        }

        Err(MediaError::ProbeUnavailable(format!(
            "none of [{}] is installed",
            self.candidates.join(", ")
        )))
    }
}
