//! Run state machine: PLANNING → DEPLOYING(1..n) → WIRING(1..m) → DONE, or FAILED.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a run currently is. Steps are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RunState {
    Planning,
    Deploying { step: usize, total: usize },
    Wiring { step: usize, total: usize },
    Done,
    Failed,
}

impl RunState {
    /// Whether `next` directly follows `self`. Steps are never skipped.
    pub fn can_transition_to(&self, next: &RunState) -> bool {
        use RunState::*;

        match (*self, *next) {
            (Planning, Deploying { step: 1, total }) => total >= 1,
            (Planning, Done | Failed) => true,
            (Deploying { step, total }, Deploying { step: next_step, total: next_total }) => {
                total == next_total && next_step == step + 1 && next_step <= total
            }
            (Deploying { step, total }, Wiring { step: 1, total: wiring }) => {
                step == total && wiring >= 1
            }
            (Deploying { step, total }, Done) => step == total,
            (Wiring { step, total }, Wiring { step: next_step, total: next_total }) => {
                total == next_total && next_step == step + 1 && next_step <= total
            }
            (Wiring { step, total }, Done) => step == total,
            (Deploying { .. } | Wiring { .. }, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "PLANNING"),
            Self::Deploying { step, total } => write!(f, "DEPLOYING({step}/{total})"),
            Self::Wiring { step, total } => write!(f, "WIRING({step}/{total})"),
            Self::Done => write!(f, "DONE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Tracks the current state of a run and every state it went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTracker {
    history: Vec<RunState>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self {
            history: vec![RunState::Planning],
        }
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> RunState {
        self.history
            .last()
            .copied()
            .unwrap_or(RunState::Planning)
    }

    /// Move to `next`.
    pub fn enter(&mut self, next: RunState) {
        let current = self.current();
        debug_assert!(
            current.can_transition_to(&next),
            "invalid run transition {current} -> {next}"
        );
        tracing::debug!(from = %current, to = %next, "Run state changed");
        self.history.push(next);
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<RunState> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RunState::*;

    #[test]
    fn test_full_sequence_is_valid() {
        let sequence = [
            Planning,
            Deploying { step: 1, total: 2 },
            Deploying { step: 2, total: 2 },
            Wiring { step: 1, total: 2 },
            Wiring { step: 2, total: 2 },
            Done,
        ];
        for pair in sequence.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_steps_cannot_be_skipped() {
        assert!(!Deploying { step: 1, total: 3 }.can_transition_to(&Deploying { step: 3, total: 3 }));
        assert!(!Deploying { step: 1, total: 3 }.can_transition_to(&Wiring { step: 1, total: 1 }));
        assert!(!Deploying { step: 2, total: 3 }.can_transition_to(&Done));
        assert!(!Planning.can_transition_to(&Deploying { step: 2, total: 3 }));
        assert!(!Planning.can_transition_to(&Wiring { step: 1, total: 1 }));
        assert!(!Wiring { step: 1, total: 2 }.can_transition_to(&Done));
    }

    #[test]
    fn test_failure_reachable_from_active_states() {
        assert!(Planning.can_transition_to(&Failed));
        assert!(Deploying { step: 2, total: 3 }.can_transition_to(&Failed));
        assert!(Wiring { step: 1, total: 2 }.can_transition_to(&Failed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in [Planning, Deploying { step: 1, total: 1 }, Done, Failed] {
            assert!(!Done.can_transition_to(&next));
            assert!(!Failed.can_transition_to(&next));
        }
        assert!(Done.is_terminal());
        assert!(!Planning.is_terminal());
    }

    #[test]
    fn test_tracker_records_history() {
        let mut tracker = RunTracker::new();
        tracker.enter(Deploying { step: 1, total: 1 });
        tracker.enter(Done);

        assert_eq!(tracker.current(), Done);
        assert_eq!(
            tracker.history(),
            &[Planning, Deploying { step: 1, total: 1 }, Done]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Deploying { step: 2, total: 3 }.to_string(), "DEPLOYING(2/3)");
        assert_eq!(Failed.to_string(), "FAILED");
    }
}
