// src/repo/tracker.rs

//! Repository Status Tracker: one directory, one refresh at a time.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::MonitorEvent;
use crate::errors::RefreshError;
use crate::exec::{CommandOutput, CommandRunner};
use crate::repo::attention::{detect_edge, AttentionEdge};
use crate::repo::git::{self, GitOp};
use crate::repo::status::{RefreshPhase, RepositoryStatus};

/// Stand-in deadline for timeouts too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Knobs shared by every tracker in a fleet.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// VCS executable to invoke.
    pub git: String,
    /// Deadline for a whole refresh, all commands included.
    pub timeout: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            timeout: Duration::from_secs(100),
        }
    }
}

/// Result handed to every caller that awaited a given refresh run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub status: RepositoryStatus,
    pub error: Option<RefreshError>,
    pub edge: Option<AttentionEdge>,
}

#[derive(Debug, Clone, Copy)]
struct Counts {
    ahead: u32,
    behind: u32,
    uncommitted: u32,
}

struct InFlight {
    outcome: watch::Receiver<Option<RefreshOutcome>>,
    handle: Option<JoinHandle<()>>,
}

struct Inner {
    path: PathBuf,
    settings: TrackerSettings,
    runner: Arc<dyn CommandRunner>,
    events: mpsc::Sender<MonitorEvent>,
    state: watch::Sender<RepositoryStatus>,
    in_flight: Mutex<Option<InFlight>>,
    cancel: CancellationToken,
}

/// Owns the status of one tracked directory.
///
/// Cloning is cheap and every clone refers to the same tracker. At most one
/// refresh runs at a time; concurrent callers join the run in flight and all
/// observe its outcome.
#[derive(Clone)]
pub struct RepositoryTracker {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RepositoryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryTracker")
            .field("path", &self.inner.path)
            .field("status", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl RepositoryTracker {
    /// Create a tracker for `path`.
    ///
    /// The tracker is only cancelled through [`RepositoryTracker::cancel`].
    /// Process shutdown stops whoever schedules refreshes and leaves a
    /// refresh already in flight to finish within its timeout.
    pub fn new(
        path: impl Into<PathBuf>,
        settings: TrackerSettings,
        runner: Arc<dyn CommandRunner>,
        events: mpsc::Sender<MonitorEvent>,
    ) -> Self {
        let path = path.into();
        let (state, _) = watch::channel(RepositoryStatus::new(path.clone()));
        Self {
            inner: Arc::new(Inner {
                path,
                settings,
                runner,
                events,
                state,
                in_flight: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> RepositoryStatus {
        self.inner.state.borrow().clone()
    }

    /// Watch this repository's snapshots as they are published.
    pub fn subscribe(&self) -> watch::Receiver<RepositoryStatus> {
        self.inner.state.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        lock(&self.inner.in_flight).is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Abort any in-flight command and refuse further refreshes.
    ///
    /// From this point on the tracker publishes nothing, even for a refresh
    /// whose commands already finished.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    /// Wait for the refresh in flight, if any, to finish.
    pub async fn join(&self) {
        let handle = lock(&self.inner.in_flight)
            .as_mut()
            .and_then(|f| f.handle.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(path = %self.inner.path.display(), error = %e, "refresh task ended abnormally");
            }
        }
    }

    /// Refresh counts from the working directory.
    ///
    /// - `fetch_remote` fetches all remotes first.
    /// - `notify == false` suppresses a rising attention edge; a falling edge
    ///   is always reported.
    ///
    /// Never fails: errors end up in the snapshot's `error_text`. When a
    /// refresh is already running the arguments of this call are ignored and
    /// the caller receives the running refresh's outcome.
    pub async fn refresh(&self, fetch_remote: bool, notify: bool) -> RefreshOutcome {
        if self.inner.cancel.is_cancelled() {
            return RefreshOutcome {
                status: self.snapshot(),
                error: Some(RefreshError::Cancelled),
                edge: None,
            };
        }

        let mut rx = {
            let mut slot = lock(&self.inner.in_flight);
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!(path = %self.inner.path.display(), "joining refresh already in flight");
                    in_flight.outcome.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    let inner = Arc::clone(&self.inner);
                    let handle = tokio::spawn(async move {
                        let outcome = inner.run_refresh(fetch_remote, notify).await;
                        *lock(&inner.in_flight) = None;
                        let _ = tx.send(Some(outcome));
                    });
                    *slot = Some(InFlight {
                        outcome: rx.clone(),
                        handle: Some(handle),
                    });
                    rx
                }
            }
        };

        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or_else(|| self.cancelled_outcome()),
            Err(_) => self.cancelled_outcome(),
        }
    }

    fn cancelled_outcome(&self) -> RefreshOutcome {
        RefreshOutcome {
            status: self.snapshot(),
            error: Some(RefreshError::Cancelled),
            edge: None,
        }
    }
}

impl Inner {
    async fn run_refresh(self: &Arc<Self>, fetch_remote: bool, notify: bool) -> RefreshOutcome {
        let prior_needs_attention = self.state.borrow().needs_attention();
        let now = Instant::now();
        let deadline = now.checked_add(self.settings.timeout).unwrap_or(now + FAR_FUTURE);

        self.state.send_modify(|s| {
            s.phase = RefreshPhase::Refreshing;
            s.fetching = fetch_remote;
        });
        let busy = self.state.borrow().clone();
        self.publish(MonitorEvent::StatusChanged(busy)).await;

        let result = self.run_steps_bounded(fetch_remote, deadline).await;

        self.state.send_modify(|s| {
            match &result {
                Ok(counts) => {
                    s.commits_ahead = counts.ahead;
                    s.commits_behind = counts.behind;
                    s.uncommitted_changes = counts.uncommitted;
                    s.error_text = None;
                    s.phase = RefreshPhase::Idle;
                }
                Err(e) => {
                    s.error_text = Some(e.to_string());
                    s.phase = RefreshPhase::Error;
                }
            }
            s.initial_loaded = true;
            s.fetching = false;
        });
        let status = self.state.borrow().clone();
        let error = result.err();

        match &error {
            None => info!(
                path = %self.path.display(),
                ahead = status.commits_ahead,
                behind = status.commits_behind,
                uncommitted = status.uncommitted_changes,
                "refresh complete"
            ),
            Some(e) => warn!(path = %self.path.display(), error = %e, "refresh failed"),
        }

        // A removed tracker keeps its snapshot current but stays silent,
        // including when removal lands after the commands completed.
        let edge = detect_edge(prior_needs_attention, &status, notify);
        let delivered = self.publish(MonitorEvent::StatusChanged(status.clone())).await;
        let edge = match edge {
            Some(edge) if delivered => {
                let sent = self.publish(MonitorEvent::Attention(edge.clone())).await;
                sent.then_some(edge)
            }
            _ => None,
        };

        RefreshOutcome {
            status,
            error,
            edge,
        }
    }

    /// Run the command sequence, giving up at the first of: tracker
    /// cancellation, deadline, or completion.
    async fn run_steps_bounded(
        self: &Arc<Self>,
        fetch_remote: bool,
        deadline: Instant,
    ) -> Result<Counts, RefreshError> {
        let inner = Arc::clone(self);
        let mut steps = tokio::spawn(async move { inner.run_steps(fetch_remote, deadline).await });

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => {
                steps.abort();
                Err(RefreshError::Cancelled)
            }

            _ = tokio::time::sleep_until(deadline) => {
                steps.abort();
                Err(RefreshError::Timeout(self.settings.timeout))
            }

            joined = &mut steps => match joined {
                Ok(result) => result,
                Err(e) => Err(RefreshError::Unexpected(e.to_string())),
            },
        }
    }

    async fn run_steps(&self, fetch_remote: bool, deadline: Instant) -> Result<Counts, RefreshError> {
        if fetch_remote {
            self.git(GitOp::FetchAll, deadline).await?;
        }
        let behind = git::parse_count(&self.git(GitOp::CountBehind, deadline).await?.stdout)?;
        let ahead = git::parse_count(&self.git(GitOp::CountAhead, deadline).await?.stdout)?;
        let uncommitted =
            git::count_status_entries(&self.git(GitOp::StatusList, deadline).await?.stdout);

        Ok(Counts {
            ahead,
            behind,
            uncommitted,
        })
    }

    async fn git(&self, op: GitOp, deadline: Instant) -> Result<CommandOutput, RefreshError> {
        let spec = op.spec(&self.settings.git, &self.path);
        let result = self.runner.run(spec, self.cancel.clone(), deadline).await;
        git::interpret(op, result, self.settings.timeout)
    }

    /// Send `event` downstream unless the tracker is cancelled first.
    ///
    /// Returns `false` if cancellation won, before or while waiting for room
    /// in the channel.
    async fn publish(&self, event: MonitorEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => {
                debug!(path = %self.path.display(), "tracker cancelled; dropping event");
                false
            }

            sent = self.events.send(event) => {
                if sent.is_err() {
                    debug!(path = %self.path.display(), "monitor event channel closed; dropping event");
                }
                true
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
