// src/repo/git.rs

//! The four `git` invocations a refresh needs, and how their output is read.

use std::path::Path;
use std::time::Duration;

use crate::errors::RefreshError;
use crate::exec::{CancelReason, CommandOutput, CommandSpec, RunError};

/// Logical VCS operation performed against a working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitOp {
    /// Quiet fetch of every configured remote.
    FetchAll,
    /// Commits in upstream that HEAD lacks.
    CountBehind,
    /// Commits in HEAD that upstream lacks.
    CountAhead,
    /// Porcelain working-tree status, untracked files listed, renames off.
    StatusList,
}

impl GitOp {
    pub const ALL: [GitOp; 4] = [
        GitOp::FetchAll,
        GitOp::CountBehind,
        GitOp::CountAhead,
        GitOp::StatusList,
    ];

    /// Recognise which operation a spec was built from.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Option<GitOp> {
        GitOp::ALL.into_iter().find(|op| {
            let expected = op.args();
            expected.len() == args.len()
                && expected.iter().zip(args).all(|(e, a)| *e == a.as_ref())
        })
    }

    pub fn args(self) -> &'static [&'static str] {
        match self {
            GitOp::FetchAll => &["fetch", "--all", "--quiet"],
            GitOp::CountBehind => &["rev-list", "--count", "HEAD..@{u}"],
            GitOp::CountAhead => &["rev-list", "--count", "@{u}..HEAD"],
            GitOp::StatusList => &[
                "status",
                "--untracked-files=all",
                "--no-renames",
                "--porcelain=1",
            ],
        }
    }

    pub fn spec(self, git: &str, working_dir: &Path) -> CommandSpec {
        CommandSpec::new(git, self.args().iter().copied(), working_dir)
    }

    pub fn label(self) -> &'static str {
        match self {
            GitOp::FetchAll => "fetch",
            GitOp::CountBehind => "count-behind",
            GitOp::CountAhead => "count-ahead",
            GitOp::StatusList => "status",
        }
    }
}

/// Turn a runner result into either usable output or a refresh error.
///
/// Anything on stderr counts as failure and becomes the error text verbatim.
/// A non-zero exit with a silent stderr is reported by status.
pub fn interpret(
    op: GitOp,
    result: Result<CommandOutput, RunError>,
    timeout: Duration,
) -> Result<CommandOutput, RefreshError> {
    let output = match result {
        Ok(output) => output,
        Err(RunError::Cancelled(CancelReason::Deadline)) => {
            return Err(RefreshError::Timeout(timeout));
        }
        Err(RunError::Cancelled(CancelReason::Requested)) => return Err(RefreshError::Cancelled),
        Err(RunError::Spawn(msg)) => return Err(RefreshError::SpawnFailure(msg)),
        Err(RunError::Io(msg)) => return Err(RefreshError::Unexpected(msg)),
    };

    if !output.stderr.is_empty() {
        return Err(RefreshError::CommandFailure(output.stderr));
    }
    if !output.success {
        let status = output
            .exit_code
            .map(|c| format!("exit code {c}"))
            .unwrap_or_else(|| "a signal".to_string());
        return Err(RefreshError::CommandFailure(format!(
            "git {} terminated with {status}",
            op.label()
        )));
    }
    Ok(output)
}

/// Parse the single integer printed by `rev-list --count`.
pub fn parse_count(stdout: &str) -> Result<u32, RefreshError> {
    let trimmed = stdout.trim();
    trimmed.parse::<u32>().map_err(|e| {
        RefreshError::Unexpected(format!("unexpected commit count '{trimmed}': {e}"))
    })
}

/// Number of non-empty lines in porcelain status output.
pub fn count_status_entries(stdout: &str) -> u32 {
    let n = stdout.lines().filter(|l| !l.trim_end_matches('\r').is_empty()).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}
