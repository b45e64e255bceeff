// Runtime-tunable killer parameters

use crate::killer::ThresholdTable;
use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

/// Maximum number of entries accepted for each threshold array
pub const MAX_THRESHOLDS: usize = 6;

/// Default priority floors (`oom_score_adj` equivalents of 0, 1, 6, 12)
pub const DEFAULT_ADJ: [i32; 4] = [0, 58, 352, 705];

/// Default minimum free page counts (6, 8, 16 and 64 MiB with 4 KiB pages)
pub const DEFAULT_MINFREE: [u64; 4] = [3 * 512, 2 * 1024, 4 * 1024, 16 * 1024];

/// Default diagnostic verbosity
pub const DEFAULT_DEBUG_LEVEL: u32 = 2;

/// Parameters read by the killer at the start of every pass.
///
/// `adj` and `minfree` are parallel arrays: entry *i* of one belongs to
/// entry *i* of the other. They may have different lengths; the shorter
/// one decides how many thresholds are in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tunables {
    pub adj: Vec<i32>,
    pub minfree: Vec<u64>,
    pub debug_level: u32,
}

/// Tunables shared between the daemon, the parameter directory and the killer
pub type SharedTunables = Arc<RwLock<Tunables>>;

impl Tunables {
    /// Wrap the tunables for sharing across threads
    pub fn shared(self) -> SharedTunables {
        Arc::new(RwLock::new(self))
    }

    /// Take a consistent copy of shared tunables
    pub fn snapshot(shared: &SharedTunables) -> Self {
        shared
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Build the threshold table currently in effect
    pub fn threshold_table(&self) -> ThresholdTable {
        ThresholdTable::from_parallel(&self.adj, &self.minfree)
    }

    /// Replace the priority floors from a comma separated list
    pub fn set_adj(&mut self, value: &str) -> Result<()> {
        self.adj = parse_param_array(value).context("Invalid adj list")?;
        Ok(())
    }

    /// Replace the minimum free page counts from a comma separated list
    pub fn set_minfree(&mut self, value: &str) -> Result<()> {
        self.minfree = parse_param_array(value).context("Invalid minfree list")?;
        Ok(())
    }

    /// Replace the verbosity level
    pub fn set_debug_level(&mut self, value: &str) -> Result<()> {
        self.debug_level = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid debug level: {}", value.trim()))?;
        Ok(())
    }

    /// Render an array the way it is written back to a parameter file
    pub fn format_array<T: ToString>(values: &[T]) -> String {
        values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            adj: DEFAULT_ADJ.to_vec(),
            minfree: DEFAULT_MINFREE.to_vec(),
            debug_level: DEFAULT_DEBUG_LEVEL,
        }
    }
}

/// Parse a comma separated array parameter ("0,58,352").
///
/// Whitespace around entries is ignored. An empty string yields an
/// empty array, which disables killing altogether.
pub fn parse_param_array<T>(value: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.trim();
    if value.is_empty() {
        return Ok(Vec::new());
    }

    let items: Vec<&str> = value.split(',').collect();
    if items.len() > MAX_THRESHOLDS {
        bail!(
            "Too many entries ({}), at most {} are allowed",
            items.len(),
            MAX_THRESHOLDS
        );
    }

    items
        .into_iter()
        .map(|item| {
            let item = item.trim();
            item.parse::<T>()
                .with_context(|| format!("Invalid entry: {item:?}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param_array() {
        let values: Vec<i32> = parse_param_array("0, 1,6 ,12").unwrap();
        assert_eq!(values, vec![0, 1, 6, 12]);

        let values: Vec<u64> = parse_param_array("  ").unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_parse_param_array_rejects_garbage() {
        assert!(parse_param_array::<u64>("1024,abc").is_err());
        assert!(parse_param_array::<u64>("1024,-5").is_err());
        assert!(parse_param_array::<i32>("1,2,3,4,5,6,7").is_err());
        assert!(parse_param_array::<i32>("1,2,3,4,5,6").is_ok());
    }

    #[test]
    fn test_failed_set_keeps_previous_value() {
        let mut tunables = Tunables::default();
        assert!(tunables.set_minfree("1,x").is_err());
        assert_eq!(tunables.minfree, DEFAULT_MINFREE.to_vec());

        tunables.set_adj("0,8").unwrap();
        assert_eq!(tunables.adj, vec![0, 8]);

        tunables.set_debug_level(" 5\n").unwrap();
        assert_eq!(tunables.debug_level, 5);
    }

    #[test]
    fn test_threshold_table_truncates_to_shorter_array() {
        let tunables = Tunables {
            adj: vec![0, 6, 12],
            minfree: vec![1024, 4096],
            debug_level: 0,
        };
        assert_eq!(tunables.threshold_table().len(), 2);
    }

    #[test]
    fn test_format_array() {
        assert_eq!(Tunables::format_array(&[0, 58, 352]), "0,58,352");
        assert_eq!(Tunables::format_array::<u64>(&[]), "");
    }
}
