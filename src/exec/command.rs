// src/exec/command.rs

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// A fully-specified external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I, working_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a process that ran to completion.
///
/// Both streams have trailing line terminators removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
}

/// What stopped a command before it exited on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Deadline,
    /// The caller's token fired.
    Requested,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// Deadline or caller cancellation fired first. Partial output is dropped.
    #[error("command cancelled ({0:?})")]
    Cancelled(CancelReason),

    /// The executable could not be launched; carries the OS error message.
    #[error("{0}")]
    Spawn(String),

    /// The process started but waiting for it or reading its pipes failed.
    #[error("{0}")]
    Io(String),
}

/// Run `spec` to completion, or until `cancel` fires or `deadline` passes.
///
/// The child is spawned with `kill_on_drop(true)`: when cancellation wins the
/// race the in-flight `wait_with_output` future is dropped, which kills the
/// process.
pub async fn run_command(
    spec: &CommandSpec,
    cancel: &CancellationToken,
    deadline: Instant,
) -> Result<CommandOutput, RunError> {
    debug!(
        cmd = %spec,
        cwd = %spec.working_dir.display(),
        "starting command"
    );

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| RunError::Spawn(e.to_string()))?;

    tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            debug!(cmd = %spec, "command cancelled by caller");
            Err(RunError::Cancelled(CancelReason::Requested))
        }

        _ = tokio::time::sleep_until(deadline) => {
            debug!(cmd = %spec, "command exceeded its deadline");
            Err(RunError::Cancelled(CancelReason::Deadline))
        }

        res = child.wait_with_output() => {
            let output = res.map_err(|e| RunError::Io(e.to_string()))?;
            let result = CommandOutput {
                stdout: trim_line_endings(&String::from_utf8_lossy(&output.stdout)),
                stderr: trim_line_endings(&String::from_utf8_lossy(&output.stderr)),
                exit_code: output.status.code(),
                success: output.status.success(),
            };
            trace!(
                cmd = %spec,
                exit_code = ?result.exit_code,
                stdout = %result.stdout,
                stderr = %result.stderr,
                "command exited"
            );
            Ok(result)
        }
    }
}

fn trim_line_endings(s: &str) -> String {
    s.trim_end_matches(['\r', '\n']).to_string()
}
