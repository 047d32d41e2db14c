use serde::{Deserialize, Serialize};

/// Where the set of tracked repository paths is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryStorageMode {
    /// Store paths in a TOML file (`.repowatch/repositories.toml` by default).
    File,
    /// Keep paths in memory only (lost on restart).
    Memory,
}

impl Default for RegistryStorageMode {
    fn default() -> Self {
        RegistryStorageMode::File
    }
}
