// Exit notification for killed processes

use anyhow::{Context, Result};
use procfs::process::Process;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A watched process has exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitEvent {
    pub pid: i32,
}

/// Subscription to process exit.
///
/// Every `register` must be answered by exactly one `ExitEvent` for that
/// pid on the event channel the watcher was built with, unless the pid is
/// unregistered first.
pub trait ExitWatcher: Send + Sync {
    fn register(&self, pid: i32);
    fn unregister(&self, pid: i32);
}

enum WatchCommand {
    /// Watch `pid`; `start_time` identifies the process that owned it
    Register { pid: i32, start_time: Option<u64> },
    Unregister(i32),
}

/// Polls /proc for registered pids on a background thread
pub struct ProcfsExitWatcher {
    commands: Mutex<Sender<WatchCommand>>,
}

impl ProcfsExitWatcher {
    /// Start the polling thread.
    ///
    /// The thread stops once the watcher is dropped or the event receiver
    /// goes away.
    pub fn spawn(
        poll_interval: Duration,
        events: Sender<ExitEvent>,
    ) -> Result<(Self, JoinHandle<()>)> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("exit-watcher".to_string())
            .spawn(move || watch_loop(&rx, &events, poll_interval))
            .context("Failed to spawn exit watcher thread")?;

        Ok((
            Self {
                commands: Mutex::new(tx),
            },
            handle,
        ))
    }

    fn send(&self, command: WatchCommand) {
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        if commands.send(command).is_err() {
            log::error!("Exit watcher thread is gone; kills can no longer be confirmed");
        }
    }
}

impl ExitWatcher for ProcfsExitWatcher {
    fn register(&self, pid: i32) {
        // Read now, while the victim still owns the pid
        self.send(WatchCommand::Register {
            pid,
            start_time: start_time(pid),
        });
    }

    fn unregister(&self, pid: i32) {
        self.send(WatchCommand::Unregister(pid));
    }
}

fn watch_loop(commands: &Receiver<WatchCommand>, events: &Sender<ExitEvent>, poll: Duration) {
    let mut watched: Vec<(i32, Option<u64>)> = Vec::new();

    loop {
        match commands.recv_timeout(poll) {
            Ok(command) => {
                apply(command, &mut watched);
                // Take everything queued so an unregister is seen before the next poll
                while let Ok(command) = commands.try_recv() {
                    apply(command, &mut watched);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let mut gone = Vec::new();
        watched.retain(|&(pid, start_time)| {
            if has_exited(pid, start_time) {
                gone.push(pid);
                false
            } else {
                true
            }
        });

        for pid in gone {
            log::debug!("Process {pid} has exited");
            if events.send(ExitEvent { pid }).is_err() {
                return;
            }
        }
    }
}

fn apply(command: WatchCommand, watched: &mut Vec<(i32, Option<u64>)>) {
    match command {
        WatchCommand::Register { pid, start_time } => {
            if !watched.iter().any(|&(p, _)| p == pid) {
                watched.push((pid, start_time));
            }
        }
        WatchCommand::Unregister(pid) => watched.retain(|&(p, _)| p != pid),
    }
}

/// Start time of `pid` in clock ticks since boot, if it is still running
fn start_time(pid: i32) -> Option<u64> {
    Process::new(pid).and_then(|p| p.stat()).ok().map(|stat| stat.starttime)
}

/// A process is gone once /proc no longer has it, only its zombie is left,
/// or its pid now belongs to a process started at another time.
///
/// `start_time` of `None` means the process was already gone when it was
/// registered.
pub fn has_exited(pid: i32, start_time: Option<u64>) -> bool {
    let Some(expected) = start_time else {
        return true;
    };
    match Process::new(pid).and_then(|p| p.stat()) {
        Ok(stat) => stat.starttime != expected || matches!(stat.state, 'Z' | 'X' | 'x'),
        Err(_) => true,
    }
}

/// Reports every registered pid as exited right away.
///
/// Used in dry run mode, where nothing is killed and waiting for an exit
/// would keep the guard set forever.
pub struct ImmediateExitWatcher {
    events: Mutex<Sender<ExitEvent>>,
}

impl ImmediateExitWatcher {
    pub fn new(events: Sender<ExitEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }
}

impl ExitWatcher for ImmediateExitWatcher {
    fn register(&self, pid: i32) {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.send(ExitEvent { pid }).is_err() {
            log::error!("Exit event receiver is gone");
        }
    }

    fn unregister(&self, _pid: i32) {}
}
