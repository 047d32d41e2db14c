// src/repo/status.rs

use std::path::{Path, PathBuf};

/// Lifecycle of a tracker between refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPhase {
    #[default]
    Idle,
    Refreshing,
    /// The last completed refresh failed; `error_text` says why.
    Error,
}

/// Immutable snapshot of one tracked directory.
///
/// A new snapshot is published when a refresh starts (busy) and exactly once
/// when it completes. Counts and `error_text` always come from the same
/// refresh: on failure the counts are left as they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryStatus {
    pub path: PathBuf,
    pub commits_ahead: u32,
    pub commits_behind: u32,
    /// Working-tree entries, untracked files included.
    pub uncommitted_changes: u32,
    pub error_text: Option<String>,
    /// True once any refresh has completed, successful or not.
    pub initial_loaded: bool,
    pub phase: RefreshPhase,
    /// True while the in-flight refresh includes a remote fetch.
    pub fetching: bool,
}

impl RepositoryStatus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            commits_ahead: 0,
            commits_behind: 0,
            uncommitted_changes: 0,
            error_text: None,
            initial_loaded: false,
            phase: RefreshPhase::Idle,
            fetching: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn busy(&self) -> bool {
        self.phase == RefreshPhase::Refreshing
    }

    pub fn has_error(&self) -> bool {
        self.error_text.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Diverged from upstream with no error masking the counts.
    ///
    /// Uncommitted changes are shown but never raise attention.
    pub fn needs_attention(&self) -> bool {
        !self.has_error() && u64::from(self.commits_ahead) + u64::from(self.commits_behind) > 0
    }

    /// Short human-readable summary for list views and logs.
    pub fn status_text(&self) -> String {
        if self.busy() && self.fetching {
            return "Fetching".to_string();
        }
        if self.busy() {
            return "Updating".to_string();
        }
        if self.has_error() {
            return "Error".to_string();
        }
        if !self.initial_loaded {
            return String::new();
        }
        if self.needs_attention() || self.uncommitted_changes > 0 {
            return format!(
                "{}↓ / {}↑ / {}*",
                self.commits_behind, self.commits_ahead, self.uncommitted_changes
            );
        }
        "Up to date".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(ahead: u32, behind: u32, uncommitted: u32) -> RepositoryStatus {
        RepositoryStatus {
            commits_ahead: ahead,
            commits_behind: behind,
            uncommitted_changes: uncommitted,
            initial_loaded: true,
            ..RepositoryStatus::new("/repos/a")
        }
    }

    #[test]
    fn synchronized_repo_is_up_to_date() {
        let s = loaded(0, 0, 0);
        assert!(!s.needs_attention());
        assert_eq!(s.status_text(), "Up to date");
    }

    #[test]
    fn divergence_needs_attention() {
        let s = loaded(1, 2, 3);
        assert!(s.needs_attention());
        assert_eq!(s.status_text(), "2↓ / 1↑ / 3*");
    }

    #[test]
    fn uncommitted_changes_are_informational() {
        let s = loaded(0, 0, 4);
        assert!(!s.needs_attention());
        assert_eq!(s.status_text(), "0↓ / 0↑ / 4*");
    }

    #[test]
    fn error_masks_attention() {
        let s = RepositoryStatus {
            error_text: Some("could not resolve host".to_string()),
            phase: RefreshPhase::Error,
            ..loaded(0, 5, 0)
        };
        assert!(s.has_error());
        assert!(!s.needs_attention());
        assert_eq!(s.status_text(), "Error");
    }

    #[test]
    fn empty_error_text_is_not_an_error() {
        let s = RepositoryStatus {
            error_text: Some(String::new()),
            ..loaded(0, 1, 0)
        };
        assert!(!s.has_error());
        assert!(s.needs_attention());
    }

    #[test]
    fn busy_text_takes_precedence() {
        let mut s = loaded(0, 1, 0);
        s.phase = RefreshPhase::Refreshing;
        s.fetching = true;
        assert_eq!(s.status_text(), "Fetching");
        s.fetching = false;
        assert_eq!(s.status_text(), "Updating");
    }

    #[test]
    fn nothing_to_show_before_first_load() {
        assert_eq!(RepositoryStatus::new("/repos/a").status_text(), "");
    }
}
