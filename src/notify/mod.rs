// src/notify/mod.rs

//! Notifier collaborator: where "needs attention" edges end up.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::repo::AttentionEdge;

/// Surface and retract per-repository notifications.
pub trait Notifier: Send {
    fn show(&mut self, path: &Path, ahead: u32, behind: u32);
    fn withdraw(&mut self, path: &Path);
}

/// Notifier that reports through the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&mut self, path: &Path, ahead: u32, behind: u32) {
        warn!(path = %path.display(), ahead, behind, "update needed");
    }

    fn withdraw(&mut self, path: &Path) {
        info!(path = %path.display(), "update no longer needed");
    }
}

/// Remembers which paths currently have a notification up so repeated
/// edges reach the notifier at most once.
#[derive(Debug)]
pub struct NotificationBoard<N> {
    notifier: N,
    shown: BTreeSet<PathBuf>,
}

impl<N: Notifier> NotificationBoard<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            shown: BTreeSet::new(),
        }
    }

    pub fn is_shown(&self, path: &Path) -> bool {
        self.shown.contains(path)
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Forward `edge` unless it would be a no-op.
    pub fn apply(&mut self, edge: &AttentionEdge) {
        match edge {
            AttentionEdge::Show {
                path,
                ahead,
                behind,
            } => {
                if self.shown.insert(path.clone()) {
                    self.notifier.show(path, *ahead, *behind);
                }
            }
            AttentionEdge::Withdraw { path } => {
                if self.shown.remove(path) {
                    self.notifier.withdraw(path);
                }
            }
        }
    }
}
