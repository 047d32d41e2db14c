// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RepowatchError, Result};
use crate::registry::check_path;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RepowatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let interval = parse_setting("interval", &raw.config.interval)?;
        let timeout = parse_setting("timeout", &raw.config.timeout)?;
        validate_git(&raw)?;
        validate_repositories(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.config,
            interval,
            timeout,
            raw.repositories,
        ))
    }
}

fn parse_setting(name: &str, value: &str) -> Result<Duration> {
    let d = parse_duration(value)
        .map_err(|e| RepowatchError::ConfigError(format!("[config].{name}: {e}")))?;
    if d.is_zero() {
        return Err(RepowatchError::ConfigError(format!(
            "[config].{name} must be greater than zero"
        )));
    }
    Ok(d)
}

fn validate_git(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.git.trim().is_empty() {
        return Err(RepowatchError::ConfigError(
            "[config].git must name an executable".to_string(),
        ));
    }
    Ok(())
}

fn validate_repositories(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for path in cfg.repositories.iter() {
        check_path(path).map_err(|e| RepowatchError::ConfigError(e.to_string()))?;
        if !seen.insert(path) {
            return Err(RepowatchError::ConfigError(format!(
                "repository '{}' is listed more than once",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Parse durations like `"250ms"`, `"100s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
