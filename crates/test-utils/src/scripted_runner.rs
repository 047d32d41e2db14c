use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use repowatch::exec::backend::RunFuture;
use repowatch::exec::{CancelReason, CommandOutput, CommandRunner, CommandSpec, RunError};
use repowatch::repo::GitOp;

/// How the fake answers one invocation.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Exit 0 with this stdout.
    Ok(String),
    /// Exit 1 with this stderr.
    Fail(String),
    /// Fail to launch with this message.
    SpawnError(String),
    /// Never finish, but honour cancellation and the deadline.
    Hang,
    /// Never finish and ignore cancellation and the deadline.
    Unresponsive,
    /// Take this long (on the tokio clock), then answer.
    Delayed(Duration, Box<Scripted>),
}

impl Scripted {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Scripted::Ok(stdout.into())
    }

    pub fn fail(stderr: impl Into<String>) -> Self {
        Scripted::Fail(stderr.into())
    }

    pub fn delayed(by: Duration, then: Scripted) -> Self {
        Scripted::Delayed(by, Box::new(then))
    }
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub op: Option<GitOp>,
    pub dir: PathBuf,
    pub at: Instant,
}

#[derive(Default)]
struct ScriptState {
    sticky: HashMap<(Option<PathBuf>, GitOp), Scripted>,
    queued: HashMap<(Option<PathBuf>, GitOp), VecDeque<Scripted>>,
    calls: Vec<Call>,
    active: usize,
    max_active: usize,
}

impl ScriptState {
    fn pick(&mut self, dir: &Path, op: GitOp) -> Scripted {
        let keys = [(Some(dir.to_path_buf()), op), (None, op)];
        for key in &keys {
            if let Some(next) = self.queued.get_mut(key).and_then(VecDeque::pop_front) {
                return next;
            }
        }
        for key in &keys {
            if let Some(sticky) = self.sticky.get(key) {
                return sticky.clone();
            }
        }
        in_sync_default(op)
    }
}

fn in_sync_default(op: GitOp) -> Scripted {
    match op {
        GitOp::FetchAll | GitOp::StatusList => Scripted::ok(""),
        GitOp::CountBehind | GitOp::CountAhead => Scripted::ok("0"),
    }
}

/// A `CommandRunner` that answers git invocations from a script.
///
/// Unscripted operations behave like a repository in sync with its upstream.
/// Scripts can be global or per working directory. Queued answers (either
/// kind) are used once, in order, before any sticky answer.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    state: Arc<Mutex<ScriptState>>,
}

struct ActiveGuard(Arc<Mutex<ScriptState>>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut state = self.0.lock().unwrap();
        state.active -= 1;
    }
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every future `op` with `response`.
    pub fn set(&self, op: GitOp, response: Scripted) -> &Self {
        self.state.lock().unwrap().sticky.insert((None, op), response);
        self
    }

    /// Answer the next `op` with `response`, once.
    pub fn push(&self, op: GitOp, response: Scripted) -> &Self {
        self.state
            .lock()
            .unwrap()
            .queued
            .entry((None, op))
            .or_default()
            .push_back(response);
        self
    }

    /// Answer every future `op` run in `dir` with `response`.
    pub fn set_for(&self, dir: impl Into<PathBuf>, op: GitOp, response: Scripted) -> &Self {
        self.state
            .lock()
            .unwrap()
            .sticky
            .insert((Some(dir.into()), op), response);
        self
    }

    /// Make `dir` report the given divergence from now on.
    pub fn diverge(&self, dir: impl Into<PathBuf>, ahead: u32, behind: u32) -> &Self {
        let dir = dir.into();
        self.set_for(dir.clone(), GitOp::CountAhead, Scripted::ok(ahead.to_string()));
        self.set_for(dir, GitOp::CountBehind, Scripted::ok(behind.to_string()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, op: GitOp) -> usize {
        self.calls().iter().filter(|c| c.op == Some(op)).count()
    }

    /// Highest number of invocations that were in progress at once.
    pub fn max_concurrency(&self) -> usize {
        self.state.lock().unwrap().max_active
    }
}

async fn respond(
    response: Scripted,
    cancel: &CancellationToken,
    deadline: Instant,
) -> Result<CommandOutput, RunError> {
    let mut response = response;
    loop {
        match response {
            Scripted::Ok(stdout) => {
                return Ok(CommandOutput {
                    stdout,
                    stderr: String::new(),
                    exit_code: Some(0),
                    success: true,
                });
            }
            Scripted::Fail(stderr) => {
                return Ok(CommandOutput {
                    stdout: String::new(),
                    stderr,
                    exit_code: Some(1),
                    success: false,
                });
            }
            Scripted::SpawnError(msg) => return Err(RunError::Spawn(msg)),
            Scripted::Unresponsive => std::future::pending::<()>().await,
            Scripted::Hang => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RunError::Cancelled(CancelReason::Requested)),
                    _ = tokio::time::sleep_until(deadline) => return Err(RunError::Cancelled(CancelReason::Deadline)),
                }
            }
            Scripted::Delayed(by, then) => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RunError::Cancelled(CancelReason::Requested)),
                    _ = tokio::time::sleep_until(deadline) => return Err(RunError::Cancelled(CancelReason::Deadline)),
                    _ = tokio::time::sleep(by) => {}
                }
                response = *then;
            }
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: CommandSpec, cancel: CancellationToken, deadline: Instant) -> RunFuture<'_> {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let op = GitOp::from_args(&spec.args);
            let response = {
                let mut guard = state.lock().unwrap();
                guard.calls.push(Call {
                    op,
                    dir: spec.working_dir.clone(),
                    at: Instant::now(),
                });
                guard.active += 1;
                guard.max_active = guard.max_active.max(guard.active);
                match op {
                    Some(op) => guard.pick(&spec.working_dir, op),
                    None => Scripted::fail(format!("unscripted command: {spec}")),
                }
            };
            let _active = ActiveGuard(Arc::clone(&state));

            respond(response, &cancel, deadline).await
        })
    }
}
