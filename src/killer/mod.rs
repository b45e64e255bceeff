// Low memory killer: threshold evaluation, victim selection and the kill guard

/// Emit a diagnostic line when the configured verbosity reaches `level`.
///
/// Level 1 is a kill being issued, 2 a victim being selected, 3 pass
/// parameters and zone checks, 4 the result of a scanning pass and 5 the
/// result of an estimate-only pass.
macro_rules! lowmem_print {
    ($verbosity:expr, $level:expr, $($arg:tt)+) => {
        if $verbosity >= $level {
            match $level {
                1 => log::warn!($($arg)+),
                2 => log::info!($($arg)+),
                3 => log::debug!($($arg)+),
                _ => log::trace!($($arg)+),
            }
        }
    };
}

mod engine;
mod pending;
mod selector;
pub mod signals;
mod threshold;
pub mod watcher;
mod zone;

pub use engine::{KillerStats, LowMemoryKiller};
pub use pending::{BeginKill, PendingKill, PendingVictim};
pub use selector::{ProcessSelector, Selection};
pub use signals::{DryRunTerminator, KillResult, SigkillTerminator, Terminator};
pub use threshold::{FloorPolicy, GlobalFloor, ThresholdEntry, ThresholdTable};
pub use watcher::{ExitEvent, ExitWatcher, ImmediateExitWatcher, ProcfsExitWatcher};
pub use zone::ZoneProportionalFloor;

/// Record of a kill issued by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillInfo {
    pub pid: i32,
    pub name: String,
    pub priority: i32,
    pub resident_pages: i64,
    /// Floor in effect when the victim was chosen
    pub floor: i32,
    pub result: String,
}

impl KillInfo {
    /// Create a new KillInfo
    pub fn new(victim: &PendingVictim, floor: i32, result: &KillResult) -> Self {
        Self {
            pid: victim.pid,
            name: victim.name.clone(),
            priority: victim.priority,
            resident_pages: victim.resident_pages,
            floor,
            result: result.description().to_string(),
        }
    }
}

impl std::fmt::Display for KillInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PID {} ({}), adj {} (floor {}), {} pages: {}",
            self.pid,
            crate::sanitize_for_log(&self.name),
            self.priority,
            self.floor,
            self.resident_pages,
            self.result
        )
    }
}

/// Floor policy selected by configuration
pub fn floor_policy(zone_refinement: bool) -> Box<dyn FloorPolicy> {
    if zone_refinement {
        Box::new(ZoneProportionalFloor)
    } else {
        Box::new(GlobalFloor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_policy_selection() {
        assert!(floor_policy(true).zoned());
        assert!(!floor_policy(false).zoned());
    }

    #[test]
    fn test_kill_info_display() {
        let victim = PendingVictim {
            pid: 77,
            name: "game".to_string(),
            priority: 900,
            resident_pages: 4096,
        };
        let info = KillInfo::new(&victim, 705, &KillResult::Success);
        assert_eq!(
            info.to_string(),
            "PID 77 (game), adj 900 (floor 705), 4096 pages: signal sent"
        );
    }
}
