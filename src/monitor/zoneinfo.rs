// Per-zone counters from /proc/zoneinfo

use super::stats::{LruCounts, ZoneStats};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};

const ZONEINFO_PATH: &str = "/proc/zoneinfo";

/// Read populated zones from /proc/zoneinfo
pub fn read(swap_available: bool) -> Result<Vec<ZoneStats>> {
    let file =
        File::open(ZONEINFO_PATH).with_context(|| format!("Failed to open {ZONEINFO_PATH}"))?;
    parse(BufReader::new(file), swap_available)
}

/// Zone being accumulated while parsing
#[derive(Default)]
struct ZoneBuilder {
    name: String,
    present: u64,
    free: u64,
    file: Option<u64>,
    shmem: u64,
    lru: LruCounts,
}

impl ZoneBuilder {
    fn finish(self, swap_available: bool) -> Option<ZoneStats> {
        if self.present == 0 {
            return None;
        }

        // Newer kernels only keep file pages per node; fall back to the
        // zone's file LRU lists.
        let file = self
            .file
            .unwrap_or(self.lru.active_file + self.lru.inactive_file);

        Some(ZoneStats {
            name: self.name,
            present_pages: self.present,
            free_pages: self.free,
            file_pages: file.saturating_sub(self.shmem),
            reclaimable_pages: self.lru.reclaimable(swap_available),
            lru: self.lru,
        })
    }
}

/// Parse zoneinfo text.
///
/// ```text
/// Node 0, zone   Normal
///   per-node stats
///       nr_inactive_anon 4512
///       ...
///   pages free     422432
///         min      16270
///         present  1048576
///         ...
///         nr_zone_active_file 8812
/// ```
///
/// Node-level counters printed under "per-node stats" are skipped; they
/// end at the zone's "pages free" line. Zones with no present pages are
/// not returned.
pub fn parse<R: BufRead>(reader: R, swap_available: bool) -> Result<Vec<ZoneStats>> {
    let mut zones = Vec::new();
    let mut current: Option<ZoneBuilder> = None;
    let mut in_node_stats = false;

    for line in reader.lines() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else {
            continue;
        };

        if key == "Node" {
            if let Some(zone) = current.take().and_then(|z| z.finish(swap_available)) {
                zones.push(zone);
            }
            let name = line.split_whitespace().last().unwrap_or_default();
            current = Some(ZoneBuilder {
                name: name.to_string(),
                ..ZoneBuilder::default()
            });
            in_node_stats = false;
            continue;
        }

        let Some(zone) = current.as_mut() else {
            continue;
        };

        if key == "per-node" {
            in_node_stats = true;
            continue;
        }

        if key == "pages" {
            // "pages free N"
            in_node_stats = false;
            if tokens.next() == Some("free") {
                zone.free = parse_value(key, tokens.next())?;
            }
            continue;
        }

        if in_node_stats {
            continue;
        }

        let value = tokens.next();
        match key {
            "present" => zone.present = parse_value(key, value)?,
            "nr_free_pages" => zone.free = parse_value(key, value)?,
            "nr_file_pages" => zone.file = Some(parse_value(key, value)?),
            "nr_shmem" => zone.shmem = parse_value(key, value)?,
            "nr_zone_active_anon" | "nr_active_anon" => {
                zone.lru.active_anon = parse_value(key, value)?;
            }
            "nr_zone_inactive_anon" | "nr_inactive_anon" => {
                zone.lru.inactive_anon = parse_value(key, value)?;
            }
            "nr_zone_active_file" | "nr_active_file" => {
                zone.lru.active_file = parse_value(key, value)?;
            }
            "nr_zone_inactive_file" | "nr_inactive_file" => {
                zone.lru.inactive_file = parse_value(key, value)?;
            }
            _ => {}
        }
    }

    if let Some(zone) = current.and_then(|z| z.finish(swap_available)) {
        zones.push(zone);
    }

    Ok(zones)
}

fn parse_value(key: &str, value: Option<&str>) -> Result<u64> {
    value
        .with_context(|| format!("Missing value for {key}"))?
        .parse()
        .with_context(|| format!("Failed to parse value for {key}"))
}
