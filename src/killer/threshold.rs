// Threshold table and global floor evaluation

use crate::monitor::MemoryStats;

/// One (priority floor, minimum free pages) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdEntry {
    pub priority_floor: i32,
    pub min_free_pages: u64,
}

/// Ordered thresholds, conventionally ascending in both fields.
///
/// Order is not checked. Evaluation walks entries from index 0 and the
/// first triggering entry wins, so a table that is not ascending changes
/// which floor applies but is never rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThresholdTable {
    entries: Vec<ThresholdEntry>,
}

impl ThresholdTable {
    pub fn new(entries: Vec<ThresholdEntry>) -> Self {
        Self { entries }
    }

    /// Pair up two parallel arrays, dropping the tail of the longer one
    pub fn from_parallel(floors: &[i32], min_free: &[u64]) -> Self {
        Self {
            entries: floors
                .iter()
                .zip(min_free)
                .map(|(&priority_floor, &min_free_pages)| ThresholdEntry {
                    priority_floor,
                    min_free_pages,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[ThresholdEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Priority floor for the given counters, or `None` when no entry
    /// triggers.
    ///
    /// An entry triggers when free pages are below its minimum and either
    /// file pages or reclaimable pages are below it too. The reclaimable
    /// test catches a large file cache that cannot actually be reclaimed.
    pub fn compute_floor(
        &self,
        free_pages: u64,
        file_pages: u64,
        reclaimable_pages: u64,
    ) -> Option<i32> {
        self.first_triggered(|min_free| {
            free_pages < min_free && (file_pages < min_free || reclaimable_pages < min_free)
        })
        .map(|i| self.entries[i].priority_floor)
    }

    /// Index of the first entry whose (possibly rescaled) minimum satisfies
    /// `triggers`
    pub(crate) fn first_triggered<F>(&self, mut triggers: F) -> Option<usize>
    where
        F: FnMut(u64) -> bool,
    {
        self.entries
            .iter()
            .position(|entry| triggers(entry.min_free_pages))
    }
}

/// Strategy turning a statistics snapshot into a priority floor
pub trait FloorPolicy: Send + Sync {
    fn compute_floor(
        &self,
        table: &ThresholdTable,
        stats: &MemoryStats,
        verbosity: u32,
    ) -> Option<i32>;

    /// Whether the reclaimable estimate should be computed per zone
    fn zoned(&self) -> bool {
        false
    }
}

/// Floor from the global counters only
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalFloor;

impl FloorPolicy for GlobalFloor {
    fn compute_floor(
        &self,
        table: &ThresholdTable,
        stats: &MemoryStats,
        _verbosity: u32,
    ) -> Option<i32> {
        table.compute_floor(
            stats.free_pages,
            stats.file_pages,
            stats.reclaimable_pages,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(i32, u64)]) -> ThresholdTable {
        ThresholdTable::new(
            pairs
                .iter()
                .map(|&(priority_floor, min_free_pages)| ThresholdEntry {
                    priority_floor,
                    min_free_pages,
                })
                .collect(),
        )
    }

    fn default_table() -> ThresholdTable {
        table(&[(0, 1536), (1, 2048), (6, 4096), (12, 16384)])
    }

    #[test]
    fn test_plenty_of_memory_is_not_matched() {
        let t = default_table();
        assert_eq!(t.compute_floor(16384, 16384, 0), None);
        assert_eq!(t.compute_floor(100_000, 100_000, 100_000), None);
        // Low file cache alone does not trigger
        assert_eq!(t.compute_floor(20_000, 10, 10), None);
    }

    #[test]
    fn test_least_severe_triggered_entry_wins() {
        let t = default_table();
        assert_eq!(t.compute_floor(10_000, 10_000, 100_000), Some(12));
        assert_eq!(t.compute_floor(3000, 3000, 100_000), Some(6));
        assert_eq!(t.compute_floor(1000, 1000, 100_000), Some(0));
    }

    #[test]
    fn test_reclaimable_disjunct() {
        let t = default_table();
        // File cache is large but not reclaimable
        assert_eq!(t.compute_floor(3000, 50_000, 3000), Some(6));
        assert_eq!(t.compute_floor(3000, 50_000, 50_000), None);
    }

    #[test]
    fn test_first_match_wins_on_non_ascending_table() {
        let t = table(&[(0, 1536), (1, 1024), (6, 2048), (12, 8192)]);
        // 1000 is below every minimum; index 0 is the first hit
        assert_eq!(t.compute_floor(1000, 500, 500), Some(0));
        // 1200 misses index 1 but index 0 still comes first
        assert_eq!(t.compute_floor(1200, 500, 500), Some(0));
        // Only index 2 and 3 trigger
        assert_eq!(t.compute_floor(1800, 1800, 1800), Some(6));
    }

    #[test]
    fn test_empty_table_never_matches() {
        let t = ThresholdTable::from_parallel(&[0, 6], &[]);
        assert!(t.is_empty());
        assert_eq!(t.compute_floor(0, 0, 0), None);
    }

    #[test]
    fn test_from_parallel_truncates() {
        let t = ThresholdTable::from_parallel(&[0, 6, 12], &[1024, 4096]);
        assert_eq!(t.len(), 2);
        assert_eq!(
            t.entries()[1],
            ThresholdEntry {
                priority_floor: 6,
                min_free_pages: 4096
            }
        );
    }

    #[test]
    fn test_global_policy_uses_snapshot_counters() {
        let stats = MemoryStats {
            free_pages: 3000,
            file_pages: 3500,
            reclaimable_pages: 90_000,
            ..MemoryStats::default()
        };
        assert_eq!(GlobalFloor.compute_floor(&default_table(), &stats, 0), Some(6));
        assert!(!GlobalFloor.zoned());
    }
}
