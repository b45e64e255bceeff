// Memory and process monitoring module

mod meminfo;
mod process;
mod stats;
mod vmstat;
mod zoneinfo;

pub use meminfo::MemInfo;
pub use process::{CandidateIter, ProcessCandidate, ProcessSource, ProcfsProcesses};
pub use stats::{LruCounts, MemoryStats, ZoneStats};
pub use vmstat::VmStat;

use anyhow::bail;
use std::str::FromStr;

/// Zone subset whose LRU pages count toward the reclaimable estimate
/// when the estimate is computed per zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AllocDomain {
    /// Requests served from the Normal zone
    #[default]
    Normal,
    /// Requests that may be served from the Movable zone
    Movable,
}

impl FromStr for AllocDomain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "movable" => Ok(Self::Movable),
            _ => bail!("Invalid allocation domain: {s}"),
        }
    }
}

impl std::fmt::Display for AllocDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => f.write_str("N"),
            Self::Movable => f.write_str("M"),
        }
    }
}
