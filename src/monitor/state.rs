// Monitor state
//
// MonitorState is owned by the ChangeMonitor loop and never shared, so it is a
// plain struct: no locks, no channels.

use camino::Utf8Path;
use std::fs;
use std::time::SystemTime;

/// Lifecycle of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Watching,
    PausedForMenu,
    Terminated,
}

impl MonitorPhase {
    /// Whether the session may move from `self` to `next`.
    ///
    /// `Terminated` has no outgoing transitions.
    pub fn can_transition_to(self, next: MonitorPhase) -> bool {
        use MonitorPhase::*;
        matches!(
            (self, next),
            (Watching, PausedForMenu)
                | (Watching, Terminated)
                | (PausedForMenu, Watching)
                | (PausedForMenu, Terminated)
        )
    }
}

/// Per-session loop state. Reset on every resume, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    /// Modification time of the source at the last change check (or session start).
    pub last_known_mtime: Option<SystemTime>,

    /// Ticks elapsed in this session.
    pub tick_counter: u64,
}

impl MonitorState {
    /// Fresh state with the counter at zero.
    pub fn new(last_known_mtime: Option<SystemTime>) -> Self {
        Self {
            last_known_mtime,
            tick_counter: 0,
        }
    }

    /// Count one tick and return the new counter value.
    pub fn advance(&mut self) -> u64 {
        self.tick_counter += 1;
        self.tick_counter
    }

    /// Whether the current tick is a change-check tick.
    pub fn is_check_due(&self, poll_interval_secs: u64) -> bool {
        poll_interval_secs > 0 && self.tick_counter % poll_interval_secs == 0
    }
}

/// Modification time of `path`, or `None` if it cannot be read.
pub fn modification_time(path: &Utf8Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_is_final() {
        for next in [
            MonitorPhase::Watching,
            MonitorPhase::PausedForMenu,
            MonitorPhase::Terminated,
        ] {
            assert!(!MonitorPhase::Terminated.can_transition_to(next));
        }
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(MonitorPhase::Watching.can_transition_to(MonitorPhase::PausedForMenu));
        assert!(MonitorPhase::PausedForMenu.can_transition_to(MonitorPhase::Watching));
        assert!(MonitorPhase::PausedForMenu.can_transition_to(MonitorPhase::Terminated));
        assert!(!MonitorPhase::Watching.can_transition_to(MonitorPhase::Watching));
    }

    #[test]
    fn test_check_cadence() {
        let mut state = MonitorState::new(None);
        let due: Vec<u64> = (0..130)
            .filter_map(|_| {
                let tick = state.advance();
                state.is_check_due(60).then_some(tick)
            })
            .collect();

        assert_eq!(due, vec![60, 120]);
    }

    #[test]
    fn test_missing_file_has_no_mtime() {
        assert_eq!(modification_time(Utf8Path::new("/no/such/save.eu4")), None);
    }
}
