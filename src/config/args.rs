// Command-line argument parsing

use crate::monitor::AllocDomain;
use clap::Parser;
use std::path::PathBuf;

/// Low Memory Killer - priority-band process killer
///
/// Watches free memory and file cache and, when they drop below the
/// configured thresholds, kills the least important process whose
/// oom_score_adj is at or above the matching priority floor.
#[derive(Parser, Debug)]
#[command(name = "lowmem-killer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Low memory killer daemon", long_about = None)]
pub struct Args {
    /// Priority floors, comma separated and ascending (default: 0,58,352,705)
    /// Entry i applies when free memory drops below minfree entry i
    #[arg(short = 'a', long = "adj", value_name = "ADJ[,ADJ...]")]
    pub adj: Option<String>,

    /// Minimum free pages, comma separated and ascending
    /// (default: 1536,2048,4096,16384)
    #[arg(short = 'f', long = "minfree", value_name = "PAGES[,PAGES...]")]
    pub minfree: Option<String>,

    /// Diagnostic verbosity, 0 (silent) to 5 (every pass) (default: 2)
    #[arg(short = 'l', long = "debug-level", value_name = "LEVEL")]
    pub debug_level: Option<u32>,

    /// Memory check interval in milliseconds (default: 500)
    #[arg(short = 'i', long = "interval-ms", value_name = "MILLISECONDS")]
    pub interval_ms: Option<u64>,

    /// Status report interval in seconds (default: 60)
    #[arg(short = 'r', long = "report", value_name = "SECONDS")]
    pub report: Option<u64>,

    /// Directory exposing writable adj, minfree and debug_level files
    #[arg(long = "param-dir", value_name = "PATH")]
    pub param_dir: Option<PathBuf>,

    /// Refine the priority floor per memory zone
    #[arg(short = 'z', long = "zone-refinement")]
    pub zone_refinement: bool,

    /// Allocation domain used for the reclaimable estimate in zoned mode
    #[arg(long = "alloc-domain", value_enum, value_name = "DOMAIN")]
    pub alloc_domain: Option<AllocDomain>,

    /// Reclaim hint passed to a pass once an estimate-only pass reports reclaimable pages
    /// (default: 128)
    #[arg(long = "scan-batch", value_name = "PAGES")]
    pub scan_batch: Option<i64>,

    /// Interval for checking whether a killed process has exited
    /// (default: 100)
    #[arg(long = "exit-poll-ms", value_name = "MILLISECONDS")]
    pub exit_poll_ms: Option<u64>,

    /// Set daemon priority (-20 to 19, lower = higher priority)
    #[arg(short = 'p', long = "set-priority", value_name = "PRIORITY")]
    pub priority: Option<i32>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Dry run mode - don't actually kill processes, just report what would be killed
    #[arg(long = "dryrun")]
    pub dry_run: bool,

    /// Use syslog instead of stdout/stderr for logging
    #[arg(long = "syslog")]
    pub syslog: bool,
}

impl Args {
    /// Parse arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_thresholds_and_domain() {
        let args = Args::try_parse_from([
            "lowmem-killer",
            "--adj",
            "0,8",
            "--minfree",
            "1024,4096",
            "--alloc-domain",
            "movable",
            "-z",
        ])
        .unwrap();

        assert_eq!(args.adj.as_deref(), Some("0,8"));
        assert_eq!(args.minfree.as_deref(), Some("1024,4096"));
        assert_eq!(args.alloc_domain, Some(AllocDomain::Movable));
        assert!(args.zone_refinement);
        assert!(!args.dry_run);
    }
}
