// Signal delivery for process termination

use crate::monitor::ProcessCandidate;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// Result of a kill request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillResult {
    /// Signal was delivered
    Success,
    /// Permission denied (typically need root)
    PermissionDenied,
    /// Process not found (already exited)
    NotFound,
    /// Nothing was sent (dry run)
    Skipped,
    /// Other error occurred
    Error(String),
}

impl KillResult {
    /// Whether the victim is dead or on its way out
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::NotFound)
    }

    /// Get a human-readable description
    pub fn description(&self) -> &str {
        match self {
            Self::Success => "signal sent",
            Self::PermissionDenied => "permission denied",
            Self::NotFound => "not found",
            Self::Skipped => "skipped (dry run)",
            Self::Error(msg) => msg,
        }
    }
}

/// Fire-and-forget termination of a chosen victim.
///
/// Implementations must not wait for the process to exit; exit is
/// observed separately through an exit watcher.
pub trait Terminator: Send + Sync {
    fn terminate(&self, victim: &ProcessCandidate) -> KillResult;
}

/// Sends SIGKILL to the victim
#[derive(Debug, Default)]
pub struct SigkillTerminator;

impl Terminator for SigkillTerminator {
    fn terminate(&self, victim: &ProcessCandidate) -> KillResult {
        send_signal(victim.pid, Signal::SIGKILL)
    }
}

/// Logs the kill it would have sent
#[derive(Debug, Default)]
pub struct DryRunTerminator;

impl Terminator for DryRunTerminator {
    fn terminate(&self, victim: &ProcessCandidate) -> KillResult {
        log::info!(
            "DRY RUN: Would send SIGKILL to process {} ({})",
            victim.pid,
            crate::sanitize_for_log(&victim.name)
        );
        KillResult::Skipped
    }
}

/// Send a signal to a process
fn send_signal(pid: i32, signal: Signal) -> KillResult {
    match signal::kill(Pid::from_raw(pid), signal) {
        Ok(()) => KillResult::Success,
        Err(nix::errno::Errno::ESRCH) => KillResult::NotFound,
        Err(nix::errno::Errno::EPERM) => KillResult::PermissionDenied,
        Err(e) => KillResult::Error(format!("signal error: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(pid: i32) -> ProcessCandidate {
        ProcessCandidate {
            pid,
            name: "ghost".to_string(),
            priority: 0,
            resident_pages: 1,
        }
    }

    #[test]
    fn test_kill_result_is_success() {
        assert!(KillResult::Success.is_success());
        assert!(KillResult::NotFound.is_success());
        assert!(!KillResult::PermissionDenied.is_success());
        assert!(!KillResult::Skipped.is_success());
        assert!(!KillResult::Error("x".to_string()).is_success());
    }

    #[test]
    fn test_kill_result_description() {
        assert_eq!(KillResult::Success.description(), "signal sent");
        assert_eq!(KillResult::NotFound.description(), "not found");
        assert_eq!(
            KillResult::PermissionDenied.description(),
            "permission denied"
        );
        assert_eq!(KillResult::Error("boom".to_string()).description(), "boom");
    }

    #[test]
    fn test_kill_nonexistent_process() {
        // Beyond the default pid_max, so it cannot exist
        let result = SigkillTerminator.terminate(&candidate(999_999_999));
        assert!(matches!(
            result,
            KillResult::NotFound | KillResult::Error(_)
        ));
    }

    #[test]
    fn test_dry_run_sends_nothing() {
        assert_eq!(
            DryRunTerminator.terminate(&candidate(1)),
            KillResult::Skipped
        );
    }
}
