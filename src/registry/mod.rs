// src/registry/mod.rs

//! Persistence of the tracked path set.
//!
//! The monitor core never touches disk itself; the fleet hands the current
//! ordered path list to a `Registry` after every structural change and reads
//! it back once at startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{RepowatchError, Result};
use crate::types::RegistryStorageMode;

/// Default location of the registry file, relative to the working directory.
pub const REGISTRY_FILE_PATH: &str = ".repowatch/repositories.toml";

/// Abstract storage for tracked repository paths.
pub trait Registry: Send {
    fn load(&self) -> Result<Vec<PathBuf>>;
    fn save(&mut self, paths: &[PathBuf]) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    repositories: Vec<PathBuf>,
}

/// Stores paths in a TOML file.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Registry for FileRegistry {
    fn load(&self) -> Result<Vec<PathBuf>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no registry file yet");
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let file: RegistryFile = toml::from_str(&contents)?;
        Ok(file.repositories)
    }

    fn save(&mut self, paths: &[PathBuf]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = RegistryFile {
            repositories: paths.to_vec(),
        };
        let contents = toml::to_string(&file)?;
        fs::write(&self.path, contents)?;
        info!(
            path = %self.path.display(),
            count = paths.len(),
            "saved repository registry (file)"
        );
        Ok(())
    }
}

/// Keeps paths in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    paths: Vec<PathBuf>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Registry for MemoryRegistry {
    fn load(&self) -> Result<Vec<PathBuf>> {
        Ok(self.paths.clone())
    }

    fn save(&mut self, paths: &[PathBuf]) -> Result<()> {
        self.paths = paths.to_vec();
        Ok(())
    }
}

/// Construct the registry selected in config.
pub fn build_registry(mode: RegistryStorageMode, path: &Path) -> Box<dyn Registry> {
    match mode {
        RegistryStorageMode::File => Box::new(FileRegistry::new(path)),
        RegistryStorageMode::Memory => Box::new(MemoryRegistry::new()),
    }
}

/// Reject paths a registry should never hold.
pub fn check_path(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(RepowatchError::RegistryError(format!(
            "repository path must be absolute: {}",
            path.display()
        )));
    }
    Ok(())
}
