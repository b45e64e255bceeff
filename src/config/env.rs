// Environment variable configuration support

use super::Config;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Apply environment variable overrides to configuration
pub fn apply_env_overrides(config: Config) -> Result<Config> {
    apply_overrides(config, |key| env::var(key).ok())
}

/// Apply overrides from any key lookup (the process environment in production)
fn apply_overrides<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // Threshold tables
    if let Some(val) = lookup("LOWMEM_ADJ") {
        config.tunables.set_adj(&val).context("LOWMEM_ADJ")?;
    }
    if let Some(val) = lookup("LOWMEM_MINFREE") {
        config.tunables.set_minfree(&val).context("LOWMEM_MINFREE")?;
    }
    if let Some(val) = lookup("LOWMEM_DEBUG_LEVEL") {
        config
            .tunables
            .set_debug_level(&val)
            .context("LOWMEM_DEBUG_LEVEL")?;
    }

    // Scheduling
    if let Some(val) = lookup("LOWMEM_INTERVAL_MS") {
        config.check_interval = Duration::from_millis(val.parse()?);
    }
    if let Some(val) = lookup("LOWMEM_REPORT") {
        config.report_interval = Duration::from_secs(val.parse()?);
    }
    if let Some(val) = lookup("LOWMEM_SCAN_BATCH") {
        config.scan_batch = val.parse()?;
    }
    if let Some(val) = lookup("LOWMEM_EXIT_POLL_MS") {
        config.exit_poll_interval = Duration::from_millis(val.parse()?);
    }

    // Floor policy
    if let Some(val) = lookup("LOWMEM_ZONE_REFINEMENT") {
        config.zone_refinement = parse_bool(&val)?;
    }
    if let Some(val) = lookup("LOWMEM_ALLOC_DOMAIN") {
        config.alloc_domain = val.parse()?;
    }

    // Behavior flags
    if let Some(val) = lookup("LOWMEM_PARAM_DIR") {
        config.param_dir = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("LOWMEM_DRY_RUN") {
        config.dry_run = parse_bool(&val)?;
    }
    if let Some(val) = lookup("LOWMEM_DEBUG") {
        config.debug = parse_bool(&val)?;
    }
    if let Some(val) = lookup("LOWMEM_SYSLOG") {
        config.syslog = parse_bool(&val)?;
    }

    // Priority
    if let Some(val) = lookup("LOWMEM_PRIORITY") {
        config.priority = Some(val.parse()?);
    }

    Ok(config)
}

/// Parse boolean value from string
/// Accepts: true/false, 1/0, yes/no, on/off (case-insensitive)
fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("Invalid boolean value: {}", s),
    }
}
