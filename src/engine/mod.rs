// src/engine/mod.rs

//! Event plumbing between the trackers and their observers.
//!
//! Trackers publish [`MonitorEvent`]s on a bounded mpsc channel; the
//! [`runtime::Runtime`] loop on the other end turns attention edges into
//! notifier calls and keeps the fleet-wide "anything needs attention" flag.
//! Sends are awaited, so no event is dropped while the runtime is alive and
//! events for one repository arrive in the order they were produced.

use std::path::PathBuf;

use crate::repo::{AttentionEdge, RepositoryStatus};

/// Events flowing from trackers and the fleet into the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A repository published a new snapshot (refresh started or finished).
    StatusChanged(RepositoryStatus),
    /// A repository crossed the "needs attention" boundary.
    Attention(AttentionEdge),
    /// A repository joined the tracked set after startup.
    RepositoryAdded { path: PathBuf },
    /// A repository left the tracked set. Its notification is withdrawn and
    /// later events for the path are ignored until it is added again.
    RepositoryRemoved { path: PathBuf },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod runtime;

pub use runtime::Runtime;
