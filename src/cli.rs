// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `repowatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "repowatch",
    version,
    about = "Watch git working directories and report when they drift from upstream.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Repowatch.toml` in the current working directory. A missing
    /// file means "use defaults".
    #[arg(long, value_name = "PATH", default_value = "Repowatch.toml")]
    pub config: String,

    /// Sweep every repository once and exit.
    #[arg(long)]
    pub once: bool,

    /// Start tracking this repository (may be repeated).
    #[arg(long = "repo", value_name = "PATH")]
    pub repos: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REPOWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config and tracked repositories, print them, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
