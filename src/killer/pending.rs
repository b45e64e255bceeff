// Single outstanding kill guard

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Victim of the kill currently in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVictim {
    pub pid: i32,
    pub name: String,
    pub priority: i32,
    pub resident_pages: i64,
}

/// Outcome of [`PendingKill::try_begin_kill`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginKill {
    /// The guard is now held for the victim
    Issued,
    /// Another kill is outstanding; nothing was attempted
    AlreadyPending,
    /// The attempt failed and the guard stayed idle
    Failed,
}

#[derive(Debug, Default)]
enum KillState {
    #[default]
    Idle,
    KillIssued(PendingVictim),
}

/// At most one kill outstanding at a time.
///
/// The state only moves `Idle -> KillIssued` in [`try_begin_kill`] and
/// `KillIssued -> Idle` in [`confirm_kill_done`]. Both run their side
/// effects (register + signal, unregister) while holding the lock, so a
/// pass can never observe `Idle` while a kill it did not see is still in
/// flight.
///
/// [`try_begin_kill`]: PendingKill::try_begin_kill
/// [`confirm_kill_done`]: PendingKill::confirm_kill_done
#[derive(Debug, Default)]
pub struct PendingKill {
    state: Mutex<KillState>,
}

impl PendingKill {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, KillState> {
        // The state is a plain enum, valid even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.lock(), KillState::KillIssued(_))
    }

    /// The victim currently in flight, if any
    pub fn victim(&self) -> Option<PendingVictim> {
        match &*self.lock() {
            KillState::Idle => None,
            KillState::KillIssued(victim) => Some(victim.clone()),
        }
    }

    /// Claim the guard for `victim` and run `issue` under the lock.
    ///
    /// `issue` returns whether the kill is now in flight; when it is not
    /// (the signal could not be delivered) the guard stays idle. `issue`
    /// is not called at all if another kill is already outstanding.
    pub fn try_begin_kill<F>(&self, victim: PendingVictim, issue: F) -> BeginKill
    where
        F: FnOnce(&PendingVictim) -> bool,
    {
        let mut state = self.lock();
        if matches!(*state, KillState::KillIssued(_)) {
            return BeginKill::AlreadyPending;
        }
        if !issue(&victim) {
            return BeginKill::Failed;
        }
        *state = KillState::KillIssued(victim);
        BeginKill::Issued
    }

    /// Release the guard if `pid` is the victim in flight, running
    /// `release` under the lock.
    ///
    /// Returns false for any other pid, leaving the state untouched.
    pub fn confirm_kill_done<F>(&self, pid: i32, release: F) -> bool
    where
        F: FnOnce(&PendingVictim),
    {
        let mut state = self.lock();
        if !matches!(&*state, KillState::KillIssued(victim) if victim.pid == pid) {
            return false;
        }
        if let KillState::KillIssued(victim) = std::mem::take(&mut *state) {
            release(&victim);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn victim(pid: i32) -> PendingVictim {
        PendingVictim {
            pid,
            name: format!("proc{pid}"),
            priority: 900,
            resident_pages: 100,
        }
    }

    #[test]
    fn test_idle_to_issued_to_idle() {
        let pending = PendingKill::new();
        assert!(!pending.is_pending());

        let mut issued = Vec::new();
        let outcome = pending.try_begin_kill(victim(10), |v| {
            issued.push(v.pid);
            true
        });
        assert_eq!(outcome, BeginKill::Issued);
        assert_eq!(issued, vec![10]);
        assert!(pending.is_pending());
        assert_eq!(pending.victim().map(|v| v.pid), Some(10));

        let mut released = Vec::new();
        assert!(pending.confirm_kill_done(10, |v| released.push(v.pid)));
        assert_eq!(released, vec![10]);
        assert!(!pending.is_pending());
    }

    #[test]
    fn test_second_kill_is_refused() {
        let pending = PendingKill::new();
        assert_eq!(pending.try_begin_kill(victim(10), |_| true), BeginKill::Issued);

        let mut called = false;
        let outcome = pending.try_begin_kill(victim(11), |_| {
            called = true;
            true
        });
        assert_eq!(outcome, BeginKill::AlreadyPending);
        assert!(!called);
        assert_eq!(pending.victim().map(|v| v.pid), Some(10));
    }

    #[test]
    fn test_confirm_for_other_pid_is_ignored() {
        let pending = PendingKill::new();
        let mut released = 0;
        assert!(!pending.confirm_kill_done(10, |_| released += 1));

        assert_eq!(pending.try_begin_kill(victim(10), |_| true), BeginKill::Issued);
        assert!(!pending.confirm_kill_done(11, |_| released += 1));
        assert!(pending.is_pending());
        assert_eq!(released, 0);
    }

    #[test]
    fn test_failed_issue_leaves_guard_idle() {
        let pending = PendingKill::new();
        assert_eq!(pending.try_begin_kill(victim(10), |_| false), BeginKill::Failed);
        assert!(!pending.is_pending());
        assert_eq!(pending.try_begin_kill(victim(11), |_| true), BeginKill::Issued);
    }

    #[test]
    fn test_concurrent_claims_issue_once() {
        let pending = Arc::new(PendingKill::new());
        let issued = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let pending = Arc::clone(&pending);
                let issued = Arc::clone(&issued);
                thread::spawn(move || {
                    pending.try_begin_kill(victim(100 + i), |_| {
                        issued.fetch_add(1, Ordering::SeqCst);
                        true
                    })
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|outcome| *outcome == BeginKill::Issued)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(issued.load(Ordering::SeqCst), 1);
    }
}
