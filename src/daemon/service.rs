// Main daemon service implementation

use crate::config::{Config, ParamDir, SharedTunables, Tunables};
use crate::killer::{
    floor_policy, DryRunTerminator, ExitEvent, ExitWatcher, ImmediateExitWatcher,
    LowMemoryKiller, ProcfsExitWatcher, SigkillTerminator, Terminator,
};
use crate::monitor::{MemInfo, MemoryStats, ProcfsProcesses};
use anyhow::{anyhow, Context, Result};
use nix::libc::{setpriority, PRIO_PROCESS};
use std::fs;
use std::io::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Set daemon niceness
fn set_daemon_priority(priority: i32) {
    let result = unsafe { setpriority(PRIO_PROCESS, 0, priority) };

    if result != 0 {
        let err = Error::last_os_error();
        log::warn!(
            "Failed to set niceness to {}: {}. May need root privileges.",
            priority,
            err
        );
    } else {
        log::info!("Set daemon niceness to {}", priority);
    }
}

/// Make the daemon the last thing any OOM killer would pick
fn protect_from_oom_killer() {
    match fs::write("/proc/self/oom_score_adj", "-1000") {
        Ok(()) => log::info!("Set oom_score_adj to -1000 (never a victim)"),
        Err(e) => log::warn!(
            "Failed to set oom_score_adj: {}. Daemon may be killed under extreme memory pressure.",
            e
        ),
    }
}

/// Daemon service that schedules reclaim passes
pub struct DaemonService {
    config: Config,
    tunables: SharedTunables,
    params: Option<ParamDir>,
    last_report: Instant,
    running: Arc<AtomicBool>,
}

impl DaemonService {
    /// Create a new daemon service
    pub fn new(config: Config) -> Self {
        let tunables = config.tunables.clone().shared();
        let params = config.param_dir.clone().map(ParamDir::new);
        Self {
            config,
            tunables,
            params,
            last_report: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the running flag for signal handling
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Build the killer and its Linux collaborators
    fn build_killer(&self) -> Result<(Arc<LowMemoryKiller>, Receiver<ExitEvent>)> {
        let (events_tx, events_rx) = mpsc::channel();

        let terminator: Box<dyn Terminator>;
        let watcher: Box<dyn ExitWatcher>;
        if self.config.dry_run {
            terminator = Box::new(DryRunTerminator);
            watcher = Box::new(ImmediateExitWatcher::new(events_tx));
        } else {
            // The watcher thread is detached; it ends with the process
            let (procfs_watcher, _handle) =
                ProcfsExitWatcher::spawn(self.config.exit_poll_interval, events_tx)?;
            terminator = Box::new(SigkillTerminator);
            watcher = Box::new(procfs_watcher);
        }

        let killer = LowMemoryKiller::new(
            Arc::clone(&self.tunables),
            floor_policy(self.config.zone_refinement),
            Box::new(ProcfsProcesses::new()),
            terminator,
            watcher,
        )
        .with_alloc_domain(self.config.alloc_domain);

        Ok((Arc::new(killer), events_rx))
    }

    /// Forward exit events to the killer on a dedicated thread
    fn spawn_exit_listener(killer: &Arc<LowMemoryKiller>, events: Receiver<ExitEvent>) -> Result<()> {
        let killer = Arc::clone(killer);
        thread::Builder::new()
            .name("exit-listener".to_string())
            .spawn(move || {
                for event in events {
                    killer.confirm_exit(event.pid);
                }
                log::debug!("Exit event channel closed");
            })
            .context("Failed to spawn exit listener thread")?;
        Ok(())
    }

    /// Main run loop
    pub fn run(&mut self) -> Result<()> {
        if let Some(priority) = self.config.priority {
            set_daemon_priority(priority);
        }
        protect_from_oom_killer();

        if let Some(params) = self.params.as_mut() {
            params
                .publish(&self.config.tunables)
                .context("Failed to publish parameters")?;
            log::info!("Runtime parameters in {}", params.path().display());
        }

        let (killer, events) = self.build_killer()?;
        Self::spawn_exit_listener(&killer, events)?;

        // Print startup information
        self.print_startup_info()?;

        self.running.store(true, Ordering::SeqCst);
        self.last_report = Instant::now();

        // Setup signal handlers
        self.setup_signal_handlers()?;

        while self.running.load(Ordering::SeqCst) {
            if let Err(e) = self.run_pass(&killer) {
                log::error!("Error in main loop: {:#}", e);
            }

            // Periodic status report
            if self.last_report.elapsed() >= self.config.report_interval {
                self.report_status(&killer, MemInfo::read());
                self.last_report = Instant::now();
            }

            // Sleep for the configured interval
            thread::sleep(self.config.check_interval);
        }

        log::info!("Low memory killer shutting down gracefully");
        Ok(())
    }

    /// Setup signal handlers for graceful shutdown
    fn setup_signal_handlers(&self) -> Result<()> {
        let running = Arc::clone(&self.running);

        // Handle SIGTERM and SIGINT
        ctrlc::set_handler(move || {
            log::info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })
        .map_err(|e| anyhow!("Failed to set signal handler: {}", e))?;

        Ok(())
    }

    /// Print startup information
    fn print_startup_info(&self) -> Result<()> {
        let meminfo = MemInfo::read()?;
        let tunables = Tunables::snapshot(&self.tunables);

        log::info!("=== Low Memory Killer v{} starting ===", env!("CARGO_PKG_VERSION"));
        log::info!("{}", meminfo);

        log::info!("Thresholds (first match wins):");
        for entry in tunables.threshold_table().entries() {
            log::info!(
                "  kill adj >= {} when free and file < {} pages",
                entry.priority_floor,
                entry.min_free_pages
            );
        }
        if tunables.threshold_table().is_empty() {
            log::warn!("No thresholds configured - nothing will be killed");
        }
        log::info!("Debug level: {}", tunables.debug_level);

        if self.config.zone_refinement {
            log::info!(
                "Zone refinement enabled (allocation domain {:?})",
                self.config.alloc_domain
            );
        }

        if self.config.dry_run {
            log::warn!("DRY RUN MODE - will not actually kill processes");
        }

        if let Some(priority) = self.config.priority {
            log::info!("Daemon priority: {}", priority);
        }

        log::info!(
            "Check interval: {}ms, report interval: {}s",
            self.config.check_interval.as_millis(),
            self.config.report_interval.as_secs()
        );
        log::info!("==========================================");

        Ok(())
    }

    /// Estimate first, and scan when reclaimable pages are reported
    fn run_pass(&mut self, killer: &LowMemoryKiller) -> Result<()> {
        if let Some(params) = self.params.as_mut() {
            params.refresh(&self.tunables);
        }

        let stats = MemoryStats::read(self.config.zone_refinement)
            .context("Failed to read memory statistics")?;

        let estimate = killer.shrink(0, &stats);
        if estimate > 0 {
            killer.shrink(self.config.scan_batch, &stats);
        }

        Ok(())
    }

    /// Report current status. A missing memory summary only shortens the
    /// report.
    fn report_status(&self, killer: &LowMemoryKiller, meminfo: Result<MemInfo>) {
        let stats = killer.stats();

        match meminfo {
            Ok(meminfo) => log::info!("Status Report: {}", meminfo),
            Err(e) => log::warn!("Status Report: memory summary unavailable: {:#}", e),
        }
        log::info!(
            "Scans: {}, kills issued: {}, confirmed: {}",
            stats.scans,
            stats.kills_issued,
            stats.kills_confirmed
        );

        if let Some(victim) = stats.pending {
            log::info!("Waiting for process {} to exit", victim.pid);
        }
        match stats.last_kill {
            Some(last) => log::info!("Last kill: {}", last),
            None => log::info!("No kills yet"),
        }
    }
}
