// src/engine/runtime.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::notify::{NotificationBoard, Notifier};
use crate::repo::AttentionEdge;

use super::MonitorEvent;

/// Consumes `MonitorEvent`s and drives the notifier.
///
/// The notifier only ever sees deduplicated calls: the board in front of it
/// drops a show for a path that is already shown and a withdraw for a path
/// that is not.
pub struct Runtime<N: Notifier> {
    event_rx: mpsc::Receiver<MonitorEvent>,
    board: NotificationBoard<N>,
    attention: BTreeMap<PathBuf, bool>,
    removed: BTreeSet<PathBuf>,
    any_attention: bool,
}

impl<N: Notifier> fmt::Debug for Runtime<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("attention", &self.attention)
            .field("any_attention", &self.any_attention)
            .finish_non_exhaustive()
    }
}

impl<N: Notifier> Runtime<N> {
    pub fn new(event_rx: mpsc::Receiver<MonitorEvent>, notifier: N) -> Self {
        Self {
            event_rx,
            board: NotificationBoard::new(notifier),
            attention: BTreeMap::new(),
            removed: BTreeSet::new(),
            any_attention: false,
        }
    }

    /// Main event loop.
    ///
    /// Runs until `ShutdownRequested` arrives or every sender is dropped.
    pub async fn run(mut self) -> Result<()> {
        info!("repowatch runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");
            if !self.handle(event) {
                info!("shutdown requested; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Apply one event. Returns `false` when the loop should stop.
    fn handle(&mut self, event: MonitorEvent) -> bool {
        match event {
            MonitorEvent::StatusChanged(status) => {
                if self.removed.contains(&status.path) {
                    debug!(path = %status.path.display(), "ignoring status of removed repository");
                    return true;
                }
                if !status.busy() {
                    info!(
                        path = %status.path.display(),
                        status = %status.status_text(),
                        error = status.error_text.as_deref().unwrap_or(""),
                        "repository status"
                    );
                }
                self.attention
                    .insert(status.path.clone(), status.needs_attention());
                self.update_aggregate();
            }
            MonitorEvent::Attention(edge) => {
                if self.removed.contains(edge.path()) {
                    debug!(path = %edge.path().display(), "ignoring edge of removed repository");
                    return true;
                }
                self.board.apply(&edge);
            }
            MonitorEvent::RepositoryAdded { path } => {
                self.removed.remove(&path);
            }
            MonitorEvent::RepositoryRemoved { path } => {
                self.attention.remove(&path);
                self.board.apply(&AttentionEdge::Withdraw { path: path.clone() });
                self.removed.insert(path);
                self.update_aggregate();
            }
            MonitorEvent::ShutdownRequested => return false,
        }
        true
    }

    fn update_aggregate(&mut self) {
        let any = self.attention.values().any(|a| *a);
        if any != self.any_attention {
            self.any_attention = any;
            info!(needs_attention = any, "fleet attention changed");
        }
    }
}
