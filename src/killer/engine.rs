// Reclaim pass: floor, estimate, selection and kill

use super::pending::{BeginKill, PendingKill, PendingVictim};
use super::selector::{ProcessSelector, Selection};
use super::signals::{KillResult, Terminator};
use super::threshold::FloorPolicy;
use super::watcher::ExitWatcher;
use super::KillInfo;
use crate::config::{SharedTunables, Tunables};
use crate::monitor::{AllocDomain, MemoryStats, ProcessSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Counters and state for status reports
#[derive(Debug, Clone, Default)]
pub struct KillerStats {
    /// Passes that scanned the process set
    pub scans: u64,
    pub kills_issued: u64,
    pub kills_confirmed: u64,
    pub pending: Option<PendingVictim>,
    pub last_kill: Option<KillInfo>,
}

/// The low memory killer.
///
/// Shared between the scheduling loop and the exit-event thread; every
/// method takes `&self`.
pub struct LowMemoryKiller {
    tunables: SharedTunables,
    policy: Box<dyn FloorPolicy>,
    processes: Box<dyn ProcessSource>,
    terminator: Box<dyn Terminator>,
    watcher: Box<dyn ExitWatcher>,
    domain: AllocDomain,
    pending: PendingKill,
    scans: AtomicU64,
    kills_issued: AtomicU64,
    kills_confirmed: AtomicU64,
    last_kill: Mutex<Option<KillInfo>>,
}

impl LowMemoryKiller {
    pub fn new(
        tunables: SharedTunables,
        policy: Box<dyn FloorPolicy>,
        processes: Box<dyn ProcessSource>,
        terminator: Box<dyn Terminator>,
        watcher: Box<dyn ExitWatcher>,
    ) -> Self {
        Self {
            tunables,
            policy,
            processes,
            terminator,
            watcher,
            domain: AllocDomain::default(),
            pending: PendingKill::new(),
            scans: AtomicU64::new(0),
            kills_issued: AtomicU64::new(0),
            kills_confirmed: AtomicU64::new(0),
            last_kill: Mutex::new(None),
        }
    }

    /// Set the allocation domain used by [`shrink`](Self::shrink)
    #[must_use]
    pub fn with_alloc_domain(mut self, domain: AllocDomain) -> Self {
        self.domain = domain;
        self
    }

    /// Run one pass for the default allocation domain
    pub fn shrink(&self, reclaim_hint: i64, stats: &MemoryStats) -> i64 {
        self.shrink_for(reclaim_hint, self.domain, stats)
    }

    /// Run one pass and return the reclaimable page estimate.
    ///
    /// With `reclaim_hint <= 0` this only estimates: the estimate is returned
    /// and nothing is scanned or killed. Otherwise, if the thresholds
    /// yield a floor, the best candidate at or above it is killed and its
    /// resident pages are taken off the estimate. While an earlier kill is
    /// still outstanding the pass returns 0 straight away.
    pub fn shrink_for(&self, reclaim_hint: i64, domain: AllocDomain, stats: &MemoryStats) -> i64 {
        if self.pending.is_pending() {
            return 0;
        }

        let tunables = Tunables::snapshot(&self.tunables);
        let verbosity = tunables.debug_level;
        let table = tunables.threshold_table();
        let floor = self.policy.compute_floor(&table, stats, verbosity);

        if reclaim_hint > 0 {
            lowmem_print!(
                verbosity,
                3,
                "lowmem_shrink {}, {}, ofree {} {}, ma {:?}",
                reclaim_hint,
                domain,
                stats.free_pages,
                stats.file_pages,
                floor
            );
        }

        let mut rem = reclaimable_estimate(stats, domain, self.policy.zoned());

        let floor = match floor {
            Some(floor) if reclaim_hint > 0 => floor,
            _ => {
                lowmem_print!(
                    verbosity,
                    5,
                    "lowmem_shrink {}, {}, return {}",
                    reclaim_hint,
                    domain,
                    rem
                );
                return rem;
            }
        };

        self.scans.fetch_add(1, Ordering::Relaxed);
        let selection = self.select(floor, verbosity);
        lowmem_print!(verbosity, 3, "{}", selection);

        if let Some(victim) = selection.victim {
            let pending = PendingVictim {
                pid: victim.pid,
                name: victim.name.clone(),
                priority: victim.priority,
                resident_pages: victim.resident_pages,
            };

            let mut result = KillResult::Skipped;
            let outcome = self.pending.try_begin_kill(pending.clone(), |v| {
                lowmem_print!(
                    verbosity,
                    1,
                    "send sigkill to {} ({}), adj {}, size {}",
                    v.pid,
                    crate::sanitize_for_log(&v.name),
                    v.priority,
                    v.resident_pages
                );
                self.watcher.register(v.pid);
                result = self.terminator.terminate(&victim);
                // A dry run sends nothing but still waits for its exit event
                if !result.is_success() && result != KillResult::Skipped {
                    self.watcher.unregister(v.pid);
                    return false;
                }
                true
            });

            match outcome {
                BeginKill::Issued => {
                    rem -= victim.resident_pages;
                    self.kills_issued.fetch_add(1, Ordering::Relaxed);
                    *self
                        .last_kill
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) =
                        Some(KillInfo::new(&pending, floor, &result));
                }
                BeginKill::Failed => log::error!(
                    "Failed to kill process {} ({}): {}",
                    victim.pid,
                    crate::sanitize_for_log(&victim.name),
                    result.description()
                ),
                BeginKill::AlreadyPending => lowmem_print!(
                    verbosity,
                    3,
                    "kill already pending, not killing {}",
                    victim.pid
                ),
            }
        }

        lowmem_print!(
            verbosity,
            4,
            "lowmem_shrink {}, {}, return {}",
            reclaim_hint,
            domain,
            rem
        );
        rem
    }

    fn select(&self, floor: i32, verbosity: u32) -> Selection {
        let selector = ProcessSelector::new(floor, verbosity);
        match self.processes.scan() {
            Ok(candidates) => selector.select(candidates),
            Err(e) => {
                log::warn!("Process scan failed: {e:#}");
                Selection::default()
            }
        }
    }

    /// Handle an exit event; releases the guard if `pid` is the victim in
    /// flight
    pub fn confirm_exit(&self, pid: i32) -> bool {
        let released = self.pending.confirm_kill_done(pid, |victim| {
            self.watcher.unregister(victim.pid);
        });
        if released {
            self.kills_confirmed.fetch_add(1, Ordering::Relaxed);
            log::debug!("Kill of process {pid} confirmed, ready for the next one");
        }
        released
    }

    pub fn is_kill_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn stats(&self) -> KillerStats {
        KillerStats {
            scans: self.scans.load(Ordering::Relaxed),
            kills_issued: self.kills_issued.load(Ordering::Relaxed),
            kills_confirmed: self.kills_confirmed.load(Ordering::Relaxed),
            pending: self.pending.victim(),
            last_kill: self
                .last_kill
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// Pages on the LRU lists that the requesting domain could reclaim.
///
/// Without zone data this is the global LRU total. Per zone, every zone
/// counts except Normal and Movable, of which only the one matching the
/// allocation domain is added.
fn reclaimable_estimate(stats: &MemoryStats, domain: AllocDomain, zoned: bool) -> i64 {
    if !zoned || stats.zones.is_empty() {
        return stats.lru.total() as i64;
    }

    let mut rem = 0;
    let mut normal = 0;
    let mut movable = 0;
    for zone in &stats.zones {
        let pages = zone.lru.total();
        if zone.name.starts_with("Normal") {
            normal += pages;
        } else if zone.name.starts_with("Movable") {
            movable += pages;
        } else {
            rem += pages;
        }
    }

    let domain_pages = match domain {
        AllocDomain::Normal => normal,
        AllocDomain::Movable => movable,
    };
    (rem + domain_pages) as i64
}
