// src/fleet/tracked_set.rs

//! Ordered, unique-by-path collection of trackers.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::repo::RepositoryTracker;

/// Display ordering for repository paths.
///
/// Case-insensitive first so `/repos/Beta` sorts between `/repos/alpha` and
/// `/repos/gamma`, then exact comparison so distinct paths never tie.
pub fn collate(a: &Path, b: &Path) -> Ordering {
    let (a, b) = (a.to_string_lossy(), b.to_string_lossy());
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(&b))
}

#[derive(Debug, Default)]
pub struct TrackedSet {
    trackers: Vec<RepositoryTracker>,
}

impl TrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    pub fn get(&self, path: &Path) -> Option<&RepositoryTracker> {
        self.trackers.iter().find(|t| t.path() == path)
    }

    /// Insert before the first tracker that collates after `tracker`.
    ///
    /// Returns `false` (and drops `tracker`) when the path is already tracked.
    pub fn insert(&mut self, tracker: RepositoryTracker) -> bool {
        if self.contains(tracker.path()) {
            return false;
        }
        let idx = self
            .trackers
            .iter()
            .position(|t| collate(t.path(), tracker.path()) == Ordering::Greater)
            .unwrap_or(self.trackers.len());
        self.trackers.insert(idx, tracker);
        true
    }

    pub fn remove(&mut self, path: &Path) -> Option<RepositoryTracker> {
        let idx = self.trackers.iter().position(|t| t.path() == path)?;
        Some(self.trackers.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepositoryTracker> {
        self.trackers.iter()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.trackers.iter().map(|t| t.path().to_path_buf()).collect()
    }

    /// Clone the current ordering so callers can iterate without holding
    /// the set's lock across awaits.
    pub fn to_vec(&self) -> Vec<RepositoryTracker> {
        self.trackers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::exec::ProcessRunner;
    use crate::repo::TrackerSettings;

    fn tracker(path: &str) -> RepositoryTracker {
        let (tx, _rx) = mpsc::channel(1);
        RepositoryTracker::new(
            path,
            TrackerSettings::default(),
            Arc::new(ProcessRunner::new()),
            tx,
        )
    }

    #[test]
    fn collation_ignores_case_then_breaks_ties() {
        assert_eq!(collate(Path::new("/r/Beta"), Path::new("/r/alpha")), Ordering::Greater);
        assert_eq!(collate(Path::new("/r/beta"), Path::new("/r/Gamma")), Ordering::Less);
        assert_ne!(collate(Path::new("/r/A"), Path::new("/r/a")), Ordering::Equal);
    }

    #[test]
    fn insert_keeps_collation_order() {
        let mut set = TrackedSet::new();
        for p in ["/r/gamma", "/r/Alpha", "/r/beta"] {
            assert!(set.insert(tracker(p)));
        }
        assert_eq!(
            set.paths(),
            vec![
                PathBuf::from("/r/Alpha"),
                PathBuf::from("/r/beta"),
                PathBuf::from("/r/gamma")
            ]
        );
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let mut set = TrackedSet::new();
        assert!(set.insert(tracker("/r/a")));
        assert!(!set.insert(tracker("/r/a")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_by_path() {
        let mut set = TrackedSet::new();
        set.insert(tracker("/r/a"));
        set.insert(tracker("/r/b"));
        assert!(set.remove(Path::new("/r/a")).is_some());
        assert!(set.remove(Path::new("/r/a")).is_none());
        assert_eq!(set.paths(), vec![PathBuf::from("/r/b")]);
    }
}
