// Victim selection over one process scan

use crate::monitor::ProcessCandidate;

/// Outcome of one scan over the process set
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub victim: Option<ProcessCandidate>,
    pub scanned: usize,
    pub eligible: usize,
}

/// Picks the best victim at or above a priority floor
pub struct ProcessSelector {
    floor: i32,
    verbosity: u32,
}

impl ProcessSelector {
    pub fn new(floor: i32, verbosity: u32) -> Self {
        Self { floor, verbosity }
    }

    /// Walk the candidates once, in the order given.
    ///
    /// A candidate replaces the current best when its priority is strictly
    /// higher, or equal with a strictly larger resident size. The first
    /// seen candidate wins every remaining tie.
    pub fn select<I>(&self, candidates: I) -> Selection
    where
        I: IntoIterator<Item = ProcessCandidate>,
    {
        let mut selection = Selection::default();

        for candidate in candidates {
            selection.scanned += 1;

            if !self.is_eligible(&candidate) {
                continue;
            }
            selection.eligible += 1;

            if let Some(best) = &selection.victim {
                if !Self::beats(&candidate, best) {
                    continue;
                }
            }

            lowmem_print!(
                self.verbosity,
                2,
                "select {} ({}), adj {}, size {}, to kill",
                candidate.pid,
                crate::sanitize_for_log(&candidate.name),
                candidate.priority,
                candidate.resident_pages
            );
            selection.victim = Some(candidate);
        }

        selection
    }

    /// Below the floor or holding no memory: never a victim
    fn is_eligible(&self, candidate: &ProcessCandidate) -> bool {
        candidate.priority >= self.floor && candidate.resident_pages > 0
    }

    fn beats(candidate: &ProcessCandidate, best: &ProcessCandidate) -> bool {
        candidate.priority > best.priority
            || (candidate.priority == best.priority
                && candidate.resident_pages > best.resident_pages)
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Processes: {} scanned, {} eligible, victim {}",
            self.scanned,
            self.eligible,
            self.victim
                .as_ref()
                .map_or_else(|| "none".to_string(), |v| v.pid.to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(pid: i32, priority: i32, resident_pages: i64) -> ProcessCandidate {
        ProcessCandidate {
            pid,
            name: format!("proc{pid}"),
            priority,
            resident_pages,
        }
    }

    fn victim_pid(floor: i32, candidates: Vec<ProcessCandidate>) -> Option<i32> {
        ProcessSelector::new(floor, 0)
            .select(candidates)
            .victim
            .map(|v| v.pid)
    }

    #[test]
    fn test_higher_priority_beats_larger_size() {
        let candidates = vec![
            candidate(1, 12, 50),
            candidate(2, 12, 200),
            candidate(3, 6, 9999),
        ];
        assert_eq!(victim_pid(6, candidates), Some(2));
    }

    #[test]
    fn test_first_seen_wins_full_tie() {
        let candidates = vec![
            candidate(1, 6, 300),
            candidate(2, 6, 300),
            candidate(3, 6, 100),
        ];
        assert_eq!(victim_pid(0, candidates), Some(1));
    }

    #[test]
    fn test_below_floor_is_skipped() {
        let candidates = vec![candidate(1, -900, 1_000_000), candidate(2, 0, 10)];
        assert_eq!(victim_pid(0, candidates), Some(2));

        let candidates = vec![candidate(1, 5, 1_000_000)];
        assert_eq!(victim_pid(6, candidates), None);
    }

    #[test]
    fn test_empty_processes_are_skipped() {
        let candidates = vec![candidate(1, 15, 0), candidate(2, 15, -1), candidate(3, 1, 5)];
        assert_eq!(victim_pid(0, candidates), Some(3));
    }

    #[test]
    fn test_selection_counts() {
        let selection = ProcessSelector::new(6, 0).select(vec![
            candidate(1, 0, 100),
            candidate(2, 6, 0),
            candidate(3, 8, 100),
            candidate(4, 12, 100),
        ]);
        assert_eq!(selection.scanned, 4);
        assert_eq!(selection.eligible, 2);
        assert_eq!(selection.victim.as_ref().map(|v| v.pid), Some(4));
        assert_eq!(
            selection.to_string(),
            "Processes: 4 scanned, 2 eligible, victim 4"
        );
    }

    #[test]
    fn test_no_candidates() {
        let selection = ProcessSelector::new(0, 0).select(Vec::new());
        assert!(selection.victim.is_none());
        assert_eq!(selection.to_string(), "Processes: 0 scanned, 0 eligible, victim none");
    }
}
