// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Resolves durations and checks repository paths.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "config file not found; using defaults");
        return ConfigFile::try_from(RawConfigFile::default());
    }
    load_and_validate(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::types::RegistryStorageMode;

    #[test]
    fn loads_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Repowatch.toml");
        fs::write(
            &path,
            r#"
repositories = ["/repos/a", "/repos/b"]

[config]
interval = "30s"
timeout = "5s"
git = "/usr/bin/git"
registry = "memory"
"#,
        )
        .unwrap();

        let cfg = load_and_validate(&path).unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(30));
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.git, "/usr/bin/git");
        assert_eq!(cfg.registry, RegistryStorageMode::Memory);
        assert_eq!(cfg.repositories.len(), 2);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(300));
        assert!(cfg.repositories.is_empty());
    }

    #[test]
    fn unknown_registry_mode_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Repowatch.toml");
        fs::write(&path, "[config]\nregistry = \"cloud\"\n").unwrap();
        assert!(load_and_validate(&path).is_err());
    }
}
