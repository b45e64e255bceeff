// Memory statistics snapshot consumed by the killer

use super::meminfo::MemInfo;
use super::vmstat::VmStat;
use super::zoneinfo;
use anyhow::{bail, Context, Result};
use std::fs;

const MIN_FREE_KBYTES_PATH: &str = "/proc/sys/vm/min_free_kbytes";

/// Page counts on the four LRU lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LruCounts {
    pub active_anon: u64,
    pub inactive_anon: u64,
    pub active_file: u64,
    pub inactive_file: u64,
}

impl LruCounts {
    /// Pages on all four lists
    pub const fn total(&self) -> u64 {
        self.active_anon + self.inactive_anon + self.active_file + self.inactive_file
    }

    /// Pages that reclaim can free: file pages, plus anon pages when
    /// there is swap to push them to
    pub const fn reclaimable(&self, swap_available: bool) -> u64 {
        let file = self.active_file + self.inactive_file;
        if swap_available {
            file + self.active_anon + self.inactive_anon
        } else {
            file
        }
    }
}

/// Counters for one populated memory zone, in pages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneStats {
    pub name: String,
    pub present_pages: u64,
    pub free_pages: u64,
    /// File cache pages, shared memory excluded
    pub file_pages: u64,
    pub reclaimable_pages: u64,
    pub lru: LruCounts,
}

/// Snapshot of the memory state a pass is evaluated against.
///
/// All counts are in pages. The snapshot is not transactional; counters
/// are read one after another and may be slightly inconsistent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub free_pages: u64,
    /// File cache pages, shared memory excluded
    pub file_pages: u64,
    pub reclaimable_pages: u64,
    pub lru: LruCounts,
    /// Zone reclaimable level below which the zone pass looks at a zone
    pub low_watermark_pages: u64,
    pub zones: Vec<ZoneStats>,
}

impl MemoryStats {
    /// Read a snapshot from /proc.
    ///
    /// Zone counters are only collected when `with_zones` is set.
    pub fn read(with_zones: bool) -> Result<Self> {
        let page_size = procfs::page_size();
        let vmstat = VmStat::read()?;
        let meminfo = MemInfo::read()?;
        let swap_available = meminfo.swap_free > 0;

        let zones = if with_zones {
            zoneinfo::read(swap_available)?
        } else {
            Vec::new()
        };

        let min_free_kbytes = fs::read_to_string(MIN_FREE_KBYTES_PATH)
            .with_context(|| format!("Failed to read {MIN_FREE_KBYTES_PATH}"))?;
        let min_free_kbytes: u64 = min_free_kbytes
            .trim()
            .parse()
            .context("Failed to parse min_free_kbytes")?;

        Self::from_parts(&vmstat, swap_available, zones, min_free_kbytes, page_size)
    }

    /// Assemble a snapshot from already parsed sources
    pub fn from_parts(
        vmstat: &VmStat,
        swap_available: bool,
        zones: Vec<ZoneStats>,
        min_free_kbytes: u64,
        page_size: u64,
    ) -> Result<Self> {
        let page_kb = page_size / 1024;
        if page_kb == 0 {
            bail!("Unsupported page size: {page_size}");
        }

        Ok(Self {
            free_pages: vmstat.nr_free_pages,
            file_pages: vmstat.nr_file_pages.saturating_sub(vmstat.nr_shmem),
            reclaimable_pages: vmstat.lru.reclaimable(swap_available),
            lru: vmstat.lru,
            low_watermark_pages: min_free_kbytes / page_kb,
            zones,
        })
    }

    /// Sum of present pages over all populated zones
    pub fn total_present_pages(&self) -> u64 {
        self.zones.iter().map(|z| z.present_pages).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_totals() {
        let lru = LruCounts {
            active_anon: 10,
            inactive_anon: 20,
            active_file: 30,
            inactive_file: 40,
        };
        assert_eq!(lru.total(), 100);
        assert_eq!(lru.reclaimable(false), 70);
        assert_eq!(lru.reclaimable(true), 100);
    }

    #[test]
    fn test_from_parts_excludes_shmem_and_scales_watermark() {
        let vmstat = VmStat {
            nr_free_pages: 5000,
            nr_file_pages: 9000,
            nr_shmem: 1000,
            lru: LruCounts {
                active_anon: 100,
                inactive_anon: 200,
                active_file: 300,
                inactive_file: 400,
            },
        };

        let stats = MemoryStats::from_parts(&vmstat, false, Vec::new(), 67_584, 4096).unwrap();
        assert_eq!(stats.free_pages, 5000);
        assert_eq!(stats.file_pages, 8000);
        assert_eq!(stats.reclaimable_pages, 700);
        assert_eq!(stats.low_watermark_pages, 16_896);
        assert_eq!(stats.total_present_pages(), 0);
    }

    #[test]
    fn test_from_parts_rejects_tiny_pages() {
        let vmstat = VmStat::default();
        assert!(MemoryStats::from_parts(&vmstat, false, Vec::new(), 1024, 512).is_err());
    }
}
