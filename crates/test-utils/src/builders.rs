#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use repowatch::config::{ConfigFile, RawConfigFile};
use repowatch::engine::MonitorEvent;
use repowatch::exec::CommandRunner;
use repowatch::fleet::{Fleet, FleetOptions};
use repowatch::registry::{MemoryRegistry, Registry};
use repowatch::repo::{RepositoryTracker, TrackerSettings};
use repowatch::types::RegistryStorageMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn interval(mut self, s: &str) -> Self {
        self.config.config.interval = s.to_string();
        self
    }

    pub fn timeout(mut self, s: &str) -> Self {
        self.config.config.timeout = s.to_string();
        self
    }

    pub fn git(mut self, program: &str) -> Self {
        self.config.config.git = program.to_string();
        self
    }

    pub fn memory_registry(mut self) -> Self {
        self.config.config.registry = RegistryStorageMode::Memory;
        self
    }

    pub fn with_repository(mut self, path: &str) -> Self {
        self.config.repositories.push(PathBuf::from(path));
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a tracker or fleet test needs wired to one runner.
pub struct Harness {
    pub runner: Arc<dyn CommandRunner>,
    pub events_tx: mpsc::Sender<MonitorEvent>,
    pub events_rx: mpsc::Receiver<MonitorEvent>,
    pub shutdown: CancellationToken,
    pub settings: TrackerSettings,
}

impl Harness {
    pub fn new(runner: impl CommandRunner + 'static) -> Self {
        let (events_tx, events_rx) = mpsc::channel(1024);
        Self {
            runner: Arc::new(runner),
            events_tx,
            events_rx,
            shutdown: CancellationToken::new(),
            settings: TrackerSettings {
                git: "git".to_string(),
                timeout: Duration::from_secs(100),
            },
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn tracker(&self, path: &str) -> RepositoryTracker {
        RepositoryTracker::new(
            path,
            self.settings.clone(),
            Arc::clone(&self.runner),
            self.events_tx.clone(),
        )
    }

    pub fn fleet(&self, interval: Duration) -> Fleet {
        self.fleet_with_registry(interval, Box::new(MemoryRegistry::new()))
    }

    pub fn fleet_with_registry(&self, interval: Duration, registry: Box<dyn Registry>) -> Fleet {
        Fleet::new(
            FleetOptions {
                interval,
                tracker: self.settings.clone(),
            },
            Arc::clone(&self.runner),
            self.events_tx.clone(),
            self.shutdown.clone(),
            registry,
        )
    }

    /// Everything published so far, without waiting.
    pub fn drain_events(&mut self) -> Vec<MonitorEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.events_rx.try_recv() {
            out.push(ev);
        }
        out
    }
}
