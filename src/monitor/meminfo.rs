// Memory summary parsing from /proc/meminfo

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Memory summary used for swap detection and status reports
#[derive(Debug, Clone, Copy, Default)]
pub struct MemInfo {
    /// Total physical memory in KiB
    pub mem_total: u64,
    /// Free memory in KiB
    pub mem_free: u64,
    /// Available memory in KiB (more accurate than free)
    pub mem_available: u64,
    /// Page cache in KiB
    pub cached: u64,
    /// Total swap space in KiB
    pub swap_total: u64,
    /// Free swap space in KiB
    pub swap_free: u64,
}

impl MemInfo {
    /// Read memory information from /proc/meminfo
    pub fn read() -> Result<Self> {
        let file = File::open(MEMINFO_PATH).with_context(|| format!("Failed to open {MEMINFO_PATH}"))?;
        Self::parse(BufReader::new(file))
    }

    /// Parse meminfo text ("Key:   value kB" lines)
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut info = Self::default();

        for line in reader.lines() {
            let line = line?;
            let parts: Vec<&str> = line.split_whitespace().collect();

            if parts.len() < 2 {
                continue;
            }

            let key = parts[0].trim_end_matches(':');
            let field = match key {
                "MemTotal" => &mut info.mem_total,
                "MemFree" => &mut info.mem_free,
                "MemAvailable" => &mut info.mem_available,
                "Cached" => &mut info.cached,
                "SwapTotal" => &mut info.swap_total,
                "SwapFree" => &mut info.swap_free,
                _ => continue,
            };
            *field = parts[1]
                .parse()
                .with_context(|| format!("Failed to parse value for {key}"))?;
        }

        // Validate that we got the one field everything else is relative to
        if info.mem_total == 0 {
            anyhow::bail!("Failed to read MemTotal from meminfo");
        }

        Ok(info)
    }

    /// Calculate percentage of available memory
    pub fn mem_available_percent(&self) -> f64 {
        if self.mem_total == 0 {
            return 0.0;
        }
        (self.mem_available as f64 / self.mem_total as f64) * 100.0
    }

    /// Format memory size in human-readable format
    pub fn format_size(kb: u64) -> String {
        const MB: u64 = 1024;
        const GB: u64 = MB * 1024;

        if kb >= GB {
            format!("{:.2} GiB", kb as f64 / GB as f64)
        } else if kb >= MB {
            format!("{:.2} MiB", kb as f64 / MB as f64)
        } else {
            format!("{kb} KiB")
        }
    }
}

impl std::fmt::Display for MemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Memory: {}/{} ({:.1}% available), free {}, cached {}, Swap: {}/{}",
            Self::format_size(self.mem_available),
            Self::format_size(self.mem_total),
            self.mem_available_percent(),
            Self::format_size(self.mem_free),
            Self::format_size(self.cached),
            Self::format_size(self.swap_free),
            Self::format_size(self.swap_total),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
MemTotal:       16000000 kB
MemFree:         1000000 kB
MemAvailable:    8000000 kB
Buffers:          200000 kB
Cached:          5000000 kB
SwapCached:            0 kB
SwapTotal:       8000000 kB
SwapFree:        4000000 kB
HugePages_Total:       0
";

    #[test]
    fn test_parse_sample() {
        let info = MemInfo::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(info.mem_total, 16_000_000);
        assert_eq!(info.mem_free, 1_000_000);
        assert_eq!(info.cached, 5_000_000);
        assert_eq!(info.swap_free, 4_000_000);
        assert_eq!(info.mem_available_percent(), 50.0);
    }

    #[test]
    fn test_missing_total() {
        assert!(MemInfo::parse("MemFree: 10 kB\n".as_bytes()).is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(MemInfo::format_size(512), "512 KiB");
        assert_eq!(MemInfo::format_size(1536), "1.50 MiB");
        assert_eq!(MemInfo::format_size(1024 * 1024), "1.00 GiB");
    }
}
