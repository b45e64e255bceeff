// Global page counters from /proc/vmstat

use super::stats::LruCounts;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};

const VMSTAT_PATH: &str = "/proc/vmstat";

/// The subset of /proc/vmstat the killer needs, in pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmStat {
    pub nr_free_pages: u64,
    pub nr_file_pages: u64,
    pub nr_shmem: u64,
    pub lru: LruCounts,
}

impl VmStat {
    /// Read counters from /proc/vmstat
    pub fn read() -> Result<Self> {
        let file = File::open(VMSTAT_PATH).with_context(|| format!("Failed to open {VMSTAT_PATH}"))?;
        Self::parse(BufReader::new(file))
    }

    /// Parse "name value" lines
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut stat = Self::default();
        let mut seen_free = false;

        for line in reader.lines() {
            let line = line?;
            let mut tokens = line.split_whitespace();
            let (Some(key), Some(value)) = (tokens.next(), tokens.next()) else {
                continue;
            };

            let field = match key {
                "nr_free_pages" => {
                    seen_free = true;
                    &mut stat.nr_free_pages
                }
                "nr_file_pages" => &mut stat.nr_file_pages,
                "nr_shmem" => &mut stat.nr_shmem,
                "nr_active_anon" => &mut stat.lru.active_anon,
                "nr_inactive_anon" => &mut stat.lru.inactive_anon,
                "nr_active_file" => &mut stat.lru.active_file,
                "nr_inactive_file" => &mut stat.lru.inactive_file,
                _ => continue,
            };
            *field = value
                .parse()
                .with_context(|| format!("Failed to parse value for {key}"))?;
        }

        if !seen_free {
            bail!("nr_free_pages missing from vmstat");
        }

        Ok(stat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
nr_free_pages 41234
nr_zone_inactive_anon 1200
nr_inactive_anon 1200
nr_active_anon 3400
nr_inactive_file 5600
nr_active_file 7800
nr_unevictable 12
nr_file_pages 15000
nr_shmem 900
pgpgin 123456789
";

    #[test]
    fn test_parse_sample() {
        let stat = VmStat::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(stat.nr_free_pages, 41234);
        assert_eq!(stat.nr_file_pages, 15000);
        assert_eq!(stat.nr_shmem, 900);
        assert_eq!(stat.lru.inactive_anon, 1200);
        assert_eq!(stat.lru.active_anon, 3400);
        assert_eq!(stat.lru.inactive_file, 5600);
        assert_eq!(stat.lru.active_file, 7800);
    }

    #[test]
    fn test_missing_free_pages() {
        assert!(VmStat::parse("nr_shmem 10\n".as_bytes()).is_err());
    }

    #[test]
    fn test_bad_value() {
        assert!(VmStat::parse("nr_free_pages lots\n".as_bytes()).is_err());
    }
}
