// Configuration module

mod args;
mod env;
mod params;
mod tunables;

pub use args::Args;
pub use params::ParamDir;
pub use tunables::{
    parse_param_array, SharedTunables, Tunables, DEFAULT_ADJ, DEFAULT_DEBUG_LEVEL,
    DEFAULT_MINFREE, MAX_THRESHOLDS,
};

use crate::monitor::AllocDomain;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration struct for the low memory killer
#[derive(Debug, Clone)]
pub struct Config {
    // Runtime-tunable parameters (thresholds and verbosity)
    pub tunables: Tunables,

    // Scheduling
    pub check_interval: Duration,     // How often a pass runs
    pub report_interval: Duration,    // How often to report status
    pub scan_batch: i64,              // Reclaim hint for a scanning pass
    pub exit_poll_interval: Duration, // How often killed pids are checked

    // Floor policy
    pub zone_refinement: bool,     // Per-zone proportional floor
    pub alloc_domain: AllocDomain, // Zone subset for the estimate

    // Runtime parameter files
    pub param_dir: Option<PathBuf>,

    // Behavior flags
    pub dry_run: bool, // Don't actually kill processes
    pub debug: bool,   // Enable debug logging
    pub syslog: bool,  // Log to syslog instead of stderr

    // Priority setting
    pub priority: Option<i32>, // Daemon niceness
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let mut config = Self::default();

        // Threshold tables
        if let Some(adj) = args.adj {
            config.tunables.set_adj(&adj)?;
        }
        if let Some(minfree) = args.minfree {
            config.tunables.set_minfree(&minfree)?;
        }
        if let Some(level) = args.debug_level {
            config.tunables.debug_level = level;
        }

        // Scheduling
        if let Some(interval) = args.interval_ms {
            config.check_interval = Duration::from_millis(interval);
        }
        if let Some(report) = args.report {
            config.report_interval = Duration::from_secs(report);
        }
        if let Some(batch) = args.scan_batch {
            config.scan_batch = batch;
        }
        if let Some(poll) = args.exit_poll_ms {
            config.exit_poll_interval = Duration::from_millis(poll);
        }

        // Floor policy
        config.zone_refinement = args.zone_refinement;
        if let Some(domain) = args.alloc_domain {
            config.alloc_domain = domain;
        }

        config.param_dir = args.param_dir;

        // Behavior flags
        config.dry_run = args.dry_run;
        config.debug = args.debug;
        config.syslog = args.syslog;

        // Priority
        config.priority = args.priority;

        // Apply environment variable overrides
        config = env::apply_env_overrides(config)?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Settings that are accepted but probably not what was meant.
    ///
    /// Logged once logging is up, which happens after the configuration
    /// is built.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let (adj, minfree) = (&self.tunables.adj, &self.tunables.minfree);

        if adj.len() != minfree.len() {
            warnings.push(format!(
                "adj has {} entries but minfree has {}; only the first {} are used",
                adj.len(),
                minfree.len(),
                adj.len().min(minfree.len())
            ));
        }
        if !is_ascending(minfree) || !is_ascending(adj) {
            warnings.push(
                "Threshold tables are not ascending; the first matching entry still wins".to_string(),
            );
        }
        warnings
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.check_interval.is_zero() {
            bail!("check interval must be greater than zero");
        }
        if self.exit_poll_interval.is_zero() {
            bail!("exit poll interval must be greater than zero");
        }
        if self.scan_batch <= 0 {
            bail!("scan batch must be positive");
        }

        // Validate priority range
        if let Some(priority) = self.priority {
            if !(-20..=19).contains(&priority) {
                bail!("priority must be between -20 and 19");
            }
        }

        Ok(())
    }
}

fn is_ascending<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|pair| pair[0] <= pair[1])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tunables: Tunables::default(),
            check_interval: Duration::from_millis(500), // Check twice a second
            report_interval: Duration::from_secs(60),   // Report every minute
            scan_batch: 128,
            exit_poll_interval: Duration::from_millis(100),
            zone_refinement: false,
            alloc_domain: AllocDomain::Normal,
            param_dir: None,
            dry_run: false,
            debug: false,
            syslog: false,
            priority: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_thresholds() {
        let config = Config::default();
        assert_eq!(config.tunables.adj, DEFAULT_ADJ.to_vec());
        assert_eq!(config.tunables.minfree, DEFAULT_MINFREE.to_vec());
        assert_eq!(config.tunables.debug_level, DEFAULT_DEBUG_LEVEL);
        assert_eq!(config.scan_batch, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scan_batch = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.priority = Some(40);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.check_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mismatched_tables_are_accepted() {
        let mut config = Config::default();
        config.tunables.adj = vec![0, 6, 12];
        config.tunables.minfree = vec![1024];
        assert!(config.validate().is_ok());
        assert_eq!(config.warnings().len(), 1);
        assert!(config.warnings()[0].contains("only the first 1 are used"));
    }

    #[test]
    fn test_descending_table_warns() {
        let mut config = Config::default();
        assert!(config.warnings().is_empty());

        config.tunables.minfree = vec![4096, 1024];
        config.tunables.adj = vec![0, 6];
        assert_eq!(config.warnings().len(), 1);
    }

    #[test]
    fn test_is_ascending() {
        assert!(is_ascending(&[0, 1, 6, 12]));
        assert!(is_ascending::<u64>(&[]));
        assert!(!is_ascending(&[1536, 1024]));
    }
}
