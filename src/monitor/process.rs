// Process enumeration for victim selection

use anyhow::{Context, Result};
use procfs::process::Process;
use std::fs;

/// Per-pass view of a process that may be killed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCandidate {
    pub pid: i32,
    pub name: String,
    /// oom_score_adj; lower means more important
    pub priority: i32,
    pub resident_pages: i64,
}

impl ProcessCandidate {
    /// Build the candidate view of a live process.
    ///
    /// Returns `None` for processes that cannot be a victim: zombies and
    /// dying tasks have no address space left to free.
    pub fn read(process: &Process) -> Result<Option<Self>> {
        let stat = process.stat()?;
        if matches!(stat.state, 'Z' | 'X' | 'x') {
            return Ok(None);
        }

        let path = format!("/proc/{}/oom_score_adj", stat.pid);
        let priority: i32 = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {path}"))?
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {path}"))?;

        Ok(Some(Self {
            pid: stat.pid,
            name: stat.comm,
            priority,
            resident_pages: stat.rss as i64,
        }))
    }
}

impl std::fmt::Display for ProcessCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PID {} ({}): adj {}, {} pages",
            self.pid, self.name, self.priority, self.resident_pages
        )
    }
}

/// Iterator over the candidates of one scan
pub type CandidateIter<'a> = Box<dyn Iterator<Item = ProcessCandidate> + 'a>;

/// Source of the live process set.
///
/// Each call to `scan` starts a fresh enumeration. Implementations skip
/// processes whose priority or size cannot be read.
pub trait ProcessSource: Send + Sync {
    fn scan(&self) -> Result<CandidateIter<'_>>;
}

/// Process source backed by /proc
pub struct ProcfsProcesses {
    own_pid: i32,
}

impl ProcfsProcesses {
    pub fn new() -> Self {
        Self {
            own_pid: std::process::id() as i32,
        }
    }
}

impl Default for ProcfsProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for ProcfsProcesses {
    fn scan(&self) -> Result<CandidateIter<'_>> {
        let own_pid = self.own_pid;
        let processes = procfs::process::all_processes().context("Failed to list /proc")?;

        Ok(Box::new(
            processes
                .filter_map(std::result::Result::ok)
                // Never consider init or ourselves
                .filter(move |p| p.pid() != 1 && p.pid() != own_pid)
                .filter_map(|p| match ProcessCandidate::read(&p) {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        // Usually the process exited mid-scan
                        log::trace!("Skipping pid {}: {e:#}", p.pid());
                        None
                    }
                }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_excludes_self_and_init() {
        let source = ProcfsProcesses::new();
        let own_pid = std::process::id() as i32;
        for candidate in source.scan().unwrap() {
            assert_ne!(candidate.pid, 1);
            assert_ne!(candidate.pid, own_pid);
        }
    }

    #[test]
    fn test_read_current_process() {
        let process = Process::myself().unwrap();
        let candidate = ProcessCandidate::read(&process).unwrap().unwrap();
        assert_eq!(candidate.pid, std::process::id() as i32);
        assert!(candidate.resident_pages > 0);
        assert!((-1000..=1000).contains(&candidate.priority));
    }

    #[test]
    fn test_display() {
        let candidate = ProcessCandidate {
            pid: 42,
            name: "app".to_string(),
            priority: 900,
            resident_pages: 1234,
        };
        assert_eq!(candidate.to_string(), "PID 42 (app): adj 900, 1234 pages");
    }
}
