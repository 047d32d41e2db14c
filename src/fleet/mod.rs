// src/fleet/mod.rs

//! The tracked set of repositories and everything that mutates or sweeps it.
//!
//! - [`tracked_set`] keeps trackers unique and in display order.
//! - [`scheduler`] sweeps them on a fixed interval.
//! - [`Fleet`] is the facade external collaborators (registry, CLI, UI)
//!   call into: add, remove, manual refresh, snapshots and shutdown.

pub mod scheduler;
pub mod tracked_set;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::MonitorEvent;
use crate::exec::CommandRunner;
use crate::registry::Registry;
use crate::repo::{AttentionEdge, RefreshOutcome, RepositoryStatus, RepositoryTracker, TrackerSettings};

pub use scheduler::{next_sweep_delay, SweepMode, SweepReport, SweepScheduler};
pub use tracked_set::{collate, TrackedSet};

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fleet-wide settings.
#[derive(Debug, Clone)]
pub struct FleetOptions {
    /// Time between the starts of consecutive sweeps.
    pub interval: Duration,
    pub tracker: TrackerSettings,
}

impl Default for FleetOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            tracker: TrackerSettings::default(),
        }
    }
}

/// Owns the tracked set and every background task working on it.
pub struct Fleet {
    set: Arc<Mutex<TrackedSet>>,
    options: FleetOptions,
    runner: Arc<dyn CommandRunner>,
    events: mpsc::Sender<MonitorEvent>,
    shutdown: CancellationToken,
    registry: Mutex<Box<dyn Registry>>,
    refreshes: Mutex<Vec<JoinHandle<()>>>,
    scheduler: Mutex<Option<JoinHandle<u64>>>,
}

impl std::fmt::Debug for Fleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fleet")
            .field("set", &*lock(&self.set))
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Fleet {
    pub fn new(
        options: FleetOptions,
        runner: Arc<dyn CommandRunner>,
        events: mpsc::Sender<MonitorEvent>,
        shutdown: CancellationToken,
        registry: Box<dyn Registry>,
    ) -> Self {
        Self {
            set: Arc::new(Mutex::new(TrackedSet::new())),
            options,
            runner,
            events,
            shutdown,
            registry: Mutex::new(registry),
            refreshes: Mutex::new(Vec::new()),
            scheduler: Mutex::new(None),
        }
    }

    /// Process-wide shutdown signal; it stops the scheduler loop.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    fn new_tracker(&self, path: PathBuf) -> RepositoryTracker {
        RepositoryTracker::new(
            path,
            self.options.tracker.clone(),
            Arc::clone(&self.runner),
            self.events.clone(),
        )
    }

    /// Insert startup paths without refreshing them; the first sweep will.
    ///
    /// Returns how many were new.
    pub fn seed<I, P>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut set = lock(&self.set);
        let mut added = 0;
        for path in paths {
            if set.insert(self.new_tracker(path.into())) {
                added += 1;
            }
        }
        debug!(added, total = set.len(), "seeded tracked set");
        added
    }

    /// Seed from whatever the registry has stored.
    pub fn load_registry(&self) -> crate::errors::Result<usize> {
        let paths = lock(&self.registry).load()?;
        Ok(self.seed(paths))
    }

    /// Start tracking `path`.
    ///
    /// The new tracker is refreshed straight away (with a fetch, without a
    /// notification) so it never shows stale state. Returns `false` if the
    /// path was already tracked.
    pub fn add(&self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let tracker = self.new_tracker(path.clone());
        if !lock(&self.set).insert(tracker.clone()) {
            debug!(path = %path.display(), "repository already tracked");
            return false;
        }
        info!(path = %path.display(), "tracking repository");
        self.persist();

        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let added = MonitorEvent::RepositoryAdded {
                path: tracker.path().to_path_buf(),
            };
            if events.send(added).await.is_err() {
                debug!("monitor event channel closed; dropping event");
            }
            tracker.refresh(true, false).await;
        });
        let mut refreshes = lock(&self.refreshes);
        refreshes.retain(|h| !h.is_finished());
        refreshes.push(handle);
        true
    }

    /// Stop tracking `path`, cancelling its in-flight work and retracting
    /// any notification it raised.
    pub async fn remove(&self, path: &Path) -> bool {
        let Some(tracker) = lock(&self.set).remove(path) else {
            return false;
        };
        tracker.cancel();
        info!(path = %path.display(), "stopped tracking repository");
        self.persist();

        let path = path.to_path_buf();
        if tracker.snapshot().needs_attention() {
            self.publish(MonitorEvent::Attention(AttentionEdge::Withdraw { path: path.clone() }))
                .await;
        }
        self.publish(MonitorEvent::RepositoryRemoved { path }).await;
        true
    }

    /// Manual refresh of one repository ("fetch now", or after a pull).
    ///
    /// Safe to race the scheduler: both land on the same single-flight run.
    pub async fn refresh_now(&self, path: &Path, fetch_remote: bool) -> Option<RefreshOutcome> {
        let tracker = self.tracker(path)?;
        Some(tracker.refresh(fetch_remote, false).await)
    }

    pub fn tracker(&self, path: &Path) -> Option<RepositoryTracker> {
        lock(&self.set).get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        lock(&self.set).paths()
    }

    pub fn len(&self) -> usize {
        lock(&self.set).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.set).is_empty()
    }

    /// Current snapshot of every tracked repository, in display order.
    pub fn snapshots(&self) -> Vec<RepositoryStatus> {
        lock(&self.set).iter().map(RepositoryTracker::snapshot).collect()
    }

    /// True if any tracked repository has diverged from its upstream.
    pub fn any_needs_attention(&self) -> bool {
        lock(&self.set).iter().any(|t| t.snapshot().needs_attention())
    }

    pub fn scheduler(&self, mode: SweepMode) -> SweepScheduler {
        SweepScheduler::new(
            Arc::clone(&self.set),
            self.options.interval,
            self.shutdown.clone(),
            mode,
        )
    }

    /// Run the sweep loop in the background until shutdown.
    ///
    /// Does nothing if a scheduler is already running.
    pub fn spawn_scheduler(&self) {
        let mut slot = lock(&self.scheduler);
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        *slot = Some(tokio::spawn(self.scheduler(SweepMode::Forever).run()));
    }

    /// Wait for the refreshes started by [`Fleet::add`] to complete.
    pub async fn settle(&self) {
        let handles: Vec<_> = lock(&self.refreshes).drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "add-time refresh ended abnormally");
            }
        }
    }

    /// Stop the scheduler and wait for background work to wind down.
    ///
    /// Nothing is killed: the scheduler leaves after the repository it is
    /// refreshing, and every refresh in flight runs to completion or to its
    /// timeout.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let scheduler = lock(&self.scheduler).take();
        if let Some(handle) = scheduler {
            match handle.await {
                Ok(sweeps) => debug!(sweeps, "scheduler finished"),
                Err(e) => warn!(error = %e, "scheduler task ended abnormally"),
            }
        }

        self.settle().await;

        let trackers = lock(&self.set).to_vec();
        for tracker in trackers {
            tracker.join().await;
        }
        info!("fleet shut down");
    }

    fn persist(&self) {
        let paths = self.paths();
        if let Err(e) = lock(&self.registry).save(&paths) {
            warn!(error = %e, "failed to save repository registry");
        }
    }

    async fn publish(&self, event: MonitorEvent) {
        if self.events.send(event).await.is_err() {
            debug!("monitor event channel closed; dropping event");
        }
    }
}
