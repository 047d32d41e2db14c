// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running external commands, using
//! `tokio::process::Command`, and handing their captured output back to the
//! repository trackers.
//!
//! - [`command`] spawns a single process and races it against cancellation
//!   and a deadline.
//! - [`backend`] provides the `CommandRunner` trait and the concrete
//!   `ProcessRunner` used in production, which tests replace with a scripted
//!   fake.

pub mod backend;
pub mod command;

pub use backend::{CommandRunner, ProcessRunner};
pub use command::{run_command, CancelReason, CommandOutput, CommandSpec, RunError};
