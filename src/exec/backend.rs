// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! Repository trackers talk to a `CommandRunner` instead of spawning
//! processes directly. This makes it easy to swap in a scripted runner in
//! tests while keeping the production implementation in [`super::command`].

use std::future::Future;
use std::pin::Pin;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::command::{run_command, CommandOutput, CommandSpec, RunError};

/// Boxed future returned by [`CommandRunner::run`].
pub type RunFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommandOutput, RunError>> + Send + 'a>>;

/// Trait abstracting how an external command is executed.
///
/// Production code uses [`ProcessRunner`]; tests can provide their own
/// implementation that doesn't spawn real processes. Implementations must not
/// retry: a failed command is reported as-is and the caller decides.
pub trait CommandRunner: Send + Sync {
    /// Run `spec`, giving up with `RunError::Cancelled` once `cancel` fires or
    /// `deadline` passes.
    fn run(&self, spec: CommandSpec, cancel: CancellationToken, deadline: Instant) -> RunFuture<'_>;
}

/// Real runner used in production; spawns OS processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: CommandSpec, cancel: CancellationToken, deadline: Instant) -> RunFuture<'_> {
        Box::pin(async move { run_command(&spec, &cancel, deadline).await })
    }
}
