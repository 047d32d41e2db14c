// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::registry::REGISTRY_FILE_PATH;
use crate::types::RegistryStorageMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// repositories = ["/home/me/src/project"]
///
/// [config]
/// interval = "5m"
/// timeout = "100s"
/// git = "git"
/// registry = "file"
/// registry_path = ".repowatch/repositories.toml"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Repositories to track in addition to whatever the registry holds.
    #[serde(default)]
    pub repositories: Vec<PathBuf>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Time between the starts of two sweeps, e.g. `"5m"`.
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Deadline for one repository refresh, e.g. `"100s"`.
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Executable used for every VCS invocation.
    #[serde(default = "default_git")]
    pub git: String,

    /// Where the tracked path set is persisted.
    #[serde(default)]
    pub registry: RegistryStorageMode,

    /// Registry file location when `registry = "file"`.
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,
}

fn default_interval() -> String {
    "5m".to_string()
}

fn default_timeout() -> String {
    "100s".to_string()
}

fn default_git() -> String {
    "git".to_string()
}

fn default_registry_path() -> PathBuf {
    PathBuf::from(REGISTRY_FILE_PATH)
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
            git: default_git(),
            registry: RegistryStorageMode::default(),
            registry_path: default_registry_path(),
        }
    }
}

/// Validated configuration with durations resolved.
///
/// Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub interval: Duration,
    pub timeout: Duration,
    pub git: String,
    pub registry: RegistryStorageMode,
    pub registry_path: PathBuf,
    pub repositories: Vec<PathBuf>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        section: ConfigSection,
        interval: Duration,
        timeout: Duration,
        repositories: Vec<PathBuf>,
    ) -> Self {
        Self {
            interval,
            timeout,
            git: section.git,
            registry: section.registry,
            registry_path: section.registry_path,
            repositories,
        }
    }
}
