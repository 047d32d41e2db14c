// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepowatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RepowatchError>;

/// Why a single repository refresh failed.
///
/// Every variant is recoverable at the repository level: the tracker stores
/// the `Display` text as the snapshot's `error_text` and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// A VCS invocation reported a failure (stderr, or a bare exit status).
    #[error("{0}")]
    CommandFailure(String),

    /// The refresh deadline elapsed before every command finished.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The executable could not be launched.
    #[error("{0}")]
    SpawnFailure(String),

    /// Anything else (unparseable output, broken pipes, panics).
    #[error("{0}")]
    Unexpected(String),

    /// The tracker was removed while the refresh ran.
    #[error("cancelled")]
    Cancelled,
}
