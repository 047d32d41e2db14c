// src/repo/attention.rs

//! Edge detection for "needs attention" notifications.

use std::path::PathBuf;

use super::status::RepositoryStatus;

/// A transition of a repository's `needs_attention` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttentionEdge {
    /// false → true: surface a notification.
    Show {
        path: PathBuf,
        ahead: u32,
        behind: u32,
    },
    /// true → false: retract any outstanding notification.
    Withdraw { path: PathBuf },
}

impl AttentionEdge {
    pub fn path(&self) -> &PathBuf {
        match self {
            AttentionEdge::Show { path, .. } | AttentionEdge::Withdraw { path } => path,
        }
    }
}

/// Compare the flag captured before a refresh with the completed snapshot.
///
/// Returns `None` when nothing changed. With `notify == false` a rising edge
/// is swallowed, but a falling edge is always reported so stale
/// notifications never linger.
pub fn detect_edge(
    prior_needs_attention: bool,
    current: &RepositoryStatus,
    notify: bool,
) -> Option<AttentionEdge> {
    match (prior_needs_attention, current.needs_attention()) {
        (false, true) if notify => Some(AttentionEdge::Show {
            path: current.path.clone(),
            ahead: current.commits_ahead,
            behind: current.commits_behind,
        }),
        (true, false) => Some(AttentionEdge::Withdraw {
            path: current.path.clone(),
        }),
        _ => None,
    }
}
