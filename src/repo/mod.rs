// src/repo/mod.rs

//! Per-repository status tracking.
//!
//! - [`git`] maps the logical VCS operations onto `git` invocations and
//!   interprets their output.
//! - [`status`] holds the immutable snapshot observers receive.
//! - [`attention`] turns before/after snapshots into show/withdraw edges.
//! - [`tracker`] owns one directory's state and the single-flight refresh.

pub mod attention;
pub mod git;
pub mod status;
pub mod tracker;

pub use attention::{detect_edge, AttentionEdge};
pub use git::GitOp;
pub use status::{RefreshPhase, RepositoryStatus};
pub use tracker::{RefreshOutcome, RepositoryTracker, TrackerSettings};
