// Zone-proportional floor refinement

use super::threshold::{FloorPolicy, GlobalFloor, ThresholdTable};
use crate::monitor::{MemoryStats, ZoneStats};

/// Global floor, tightened by a per-zone check for zones that are almost
/// out of reclaimable memory.
///
/// Global counters average over every zone, so a zone can run dry while
/// free pages sit in another one (typically Movable). For each such zone
/// the thresholds are scaled to the zone's share of present pages and
/// evaluated against the zone's own free and file counts; a lower floor
/// found this way replaces the global one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneProportionalFloor;

impl FloorPolicy for ZoneProportionalFloor {
    fn compute_floor(
        &self,
        table: &ThresholdTable,
        stats: &MemoryStats,
        verbosity: u32,
    ) -> Option<i32> {
        let mut floor = GlobalFloor.compute_floor(table, stats, verbosity);

        let total_present = stats.total_present_pages();
        if total_present == 0 {
            return floor;
        }

        for zone in &stats.zones {
            if zone.reclaimable_pages >= stats.low_watermark_pages {
                continue;
            }

            lowmem_print!(
                verbosity,
                3,
                "{} : reached almost out of memory condition, reclaimable {} pages, low watermark {} pages",
                zone.name,
                zone.reclaimable_pages,
                stats.low_watermark_pages
            );

            let Some(zone_floor) = zone_boundary(table, zone, total_present, verbosity) else {
                continue;
            };

            if floor.map_or(true, |current| zone_floor < current) {
                lowmem_print!(
                    verbosity,
                    3,
                    "prev adj {} will be changed to {}",
                    floor.map_or_else(|| "none".to_string(), |f| f.to_string()),
                    zone_floor
                );
                floor = Some(zone_floor);
            }
        }

        floor
    }

    fn zoned(&self) -> bool {
        true
    }
}

/// Zone-local floor, or `None` when no scaled threshold triggers.
///
/// Each minimum is scaled by `present / total_present`. A hit at index
/// `i` yields the floor of entry `i - 1` (entry 0 for the first two
/// indices): the global pass would already have picked entry `i` itself
/// under even pressure, so the zone check reaches one band further.
pub(crate) fn zone_boundary(
    table: &ThresholdTable,
    zone: &ZoneStats,
    total_present: u64,
    verbosity: u32,
) -> Option<i32> {
    let scaled = |min_free: u64| -> u64 {
        ((u128::from(min_free) * u128::from(zone.present_pages)) / u128::from(total_present))
            as u64
    };

    let hit = table.first_triggered(|min_free| {
        let proportional = scaled(min_free);
        zone.free_pages < proportional && zone.file_pages < proportional
    });

    let floor = hit.map(|i| table.entries()[i.saturating_sub(1)].priority_floor);

    if let Some(i) = hit {
        lowmem_print!(
            verbosity,
            3,
            "{} : adj {:?}, proportional min {} pages, free {} pages, file {} pages",
            zone.name,
            floor,
            scaled(table.entries()[i].min_free_pages),
            zone.free_pages,
            zone.file_pages
        );
    }

    floor
}
