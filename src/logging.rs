// src/logging.rs

//! Logging setup for `repowatch` using `tracing` + `tracing-subscriber`.
//!
//! The level is taken from, in order:
//! 1. the `--log-level` CLI flag
//! 2. the `REPOWATCH_LOG` environment variable (a level like `debug`, or a
//!    full filter directive like `repowatch::repo=trace,info`)
//! 3. `info`
//!
//! Logs go to stderr so that stdout stays free for `--dry-run` output.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "REPOWATCH_LOG";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let directive = match cli_level {
        Some(lvl) => level_name(lvl).to_string(),
        None => std::env::var(LOG_ENV_VAR)
            .ok()
            .map(|s| normalise_directive(&s))
            .unwrap_or_else(|| "info".to_string()),
    };

    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter '{directive}'"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Accept `warning` as an alias and tolerate stray case/whitespace.
fn normalise_directive(s: &str) -> String {
    match s.trim().to_lowercase().as_str() {
        "" => "info".to_string(),
        "warning" => "warn".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_env_values() {
        assert_eq!(normalise_directive("WARNING"), "warn");
        assert_eq!(normalise_directive(" Debug "), "debug");
        assert_eq!(normalise_directive(""), "info");
        assert_eq!(
            normalise_directive("repowatch::repo=trace,info"),
            "repowatch::repo=trace,info"
        );
    }

    #[test]
    fn cli_levels_are_valid_filters() {
        for lvl in [LogLevel::Error, LogLevel::Warn, LogLevel::Info, LogLevel::Debug, LogLevel::Trace] {
            assert!(EnvFilter::try_new(level_name(lvl)).is_ok());
        }
    }
}
