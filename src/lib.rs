// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fleet;
pub mod logging;
pub mod notify;
pub mod registry;
pub mod repo;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile};
use crate::engine::{MonitorEvent, Runtime};
use crate::exec::ProcessRunner;
use crate::fleet::{Fleet, FleetOptions, SweepMode};
use crate::notify::LogNotifier;
use crate::registry::build_registry;
use crate::repo::TrackerSettings;

/// Capacity of the tracker → runtime event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the registry and the tracked set
/// - the event runtime and notifier
/// - the sweep scheduler
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config from {}", args.config))?;
    let extra = resolve_repo_args(&args.repos)?;

    if args.dry_run {
        return print_dry_run(&cfg, &extra);
    }

    let (event_tx, event_rx) = mpsc::channel::<MonitorEvent>(EVENT_CHANNEL_CAPACITY);
    let shutdown = CancellationToken::new();

    let options = FleetOptions {
        interval: cfg.interval,
        tracker: TrackerSettings {
            git: cfg.git.clone(),
            timeout: cfg.timeout,
        },
    };
    let fleet = Fleet::new(
        options,
        Arc::new(ProcessRunner::new()),
        event_tx.clone(),
        shutdown.clone(),
        build_registry(cfg.registry, &cfg.registry_path),
    );

    let from_registry = fleet.load_registry().context("loading repository registry")?;
    let from_config = fleet.seed(cfg.repositories.iter().cloned());
    info!(from_registry, from_config, "loaded tracked repositories");

    for path in extra {
        fleet.add(path);
    }

    if fleet.is_empty() {
        warn!("no repositories tracked; add some with --repo or `repositories = [...]`");
    }

    let runtime = tokio::spawn(Runtime::new(event_rx, LogNotifier).run());

    // Ctrl-C → graceful shutdown.
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; shutting down");
            shutdown.cancel();
        });
    }

    let mode = if args.once {
        SweepMode::Once
    } else {
        SweepMode::Forever
    };
    let sweeps = fleet.scheduler(mode).run().await;
    debug!(sweeps, "scheduler returned");

    fleet.shutdown().await;
    let _ = event_tx.send(MonitorEvent::ShutdownRequested).await;
    runtime.await.context("joining runtime task")??;

    Ok(())
}

/// Make `--repo` paths absolute so they compare equal to registry entries.
fn resolve_repo_args(repos: &[String]) -> Result<Vec<PathBuf>> {
    repos
        .iter()
        .map(|r| {
            std::path::absolute(Path::new(r))
                .with_context(|| format!("resolving repository path '{r}'"))
        })
        .collect()
}

/// Simple dry-run output: print settings and the repositories that would be
/// tracked.
fn print_dry_run(cfg: &ConfigFile, extra: &[PathBuf]) -> Result<()> {
    println!("repowatch dry-run");
    println!("  config.interval = {:?}", cfg.interval);
    println!("  config.timeout = {:?}", cfg.timeout);
    println!("  config.git = {}", cfg.git);
    println!("  config.registry = {:?} ({})", cfg.registry, cfg.registry_path.display());
    println!();

    let registry = build_registry(cfg.registry, &cfg.registry_path);
    let mut paths = registry.load().with_context(|| {
        format!("loading repository registry from {}", cfg.registry_path.display())
    })?;
    paths.extend(cfg.repositories.iter().cloned());
    paths.extend(extra.iter().cloned());
    paths.sort_by(|a, b| fleet::collate(a, b));
    paths.dedup();

    println!("repositories ({}):", paths.len());
    for path in paths.iter() {
        println!("  - {}", path.display());
    }

    debug!("dry-run complete (no git commands run)");
    Ok(())
}
