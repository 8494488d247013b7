//! Upload task state machine (C7).

use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// The closed set of states an `UploadTask` can occupy.
///
/// Encoded as a tagged enum rather than via inheritance per the design
/// notes: a task's status is always exactly one of these, never a
/// combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Idle,
    Hashing,
    Uploading,
    Paused,
    Success,
    Error,
    Cancelled,
}

impl TaskStatus {
    /// Whether this status has no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Error | TaskStatus::Cancelled)
    }

    /// Validates a `(previous, next)` transition against the table in the
    /// task's state machine. `prev == next` is always permitted (a no-op
    /// transition, e.g. observing status between chunk completions).
    pub fn validate_transition(prev: TaskStatus, next: TaskStatus) -> Result<(), UploadError> {
        use TaskStatus::*;

        if prev == next {
            return Ok(());
        }
        let allowed = matches!(
            (prev, next),
            (Idle, Hashing)
                | (Idle, Uploading)
                | (Hashing, Uploading)
                | (Uploading, Paused)
                | (Uploading, Success)
                | (Uploading, Error)
                | (Uploading, Cancelled)
                | (Paused, Uploading)
                | (Paused, Cancelled)
        );
        if allowed {
            Ok(())
        } else {
            Err(UploadError::InvalidTransition(format!("{prev:?} -> {next:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn terminal_states_are_exactly_success_error_cancelled() {
        assert!(Success.is_terminal());
        assert!(Error.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Idle.is_terminal());
        assert!(!Hashing.is_terminal());
        assert!(!Uploading.is_terminal());
        assert!(!Paused.is_terminal());
    }

    #[test]
    fn documented_transitions_are_allowed() {
        assert!(TaskStatus::validate_transition(Idle, Uploading).is_ok());
        assert!(TaskStatus::validate_transition(Uploading, Paused).is_ok());
        assert!(TaskStatus::validate_transition(Uploading, Success).is_ok());
        assert!(TaskStatus::validate_transition(Uploading, Error).is_ok());
        assert!(TaskStatus::validate_transition(Uploading, Cancelled).is_ok());
        assert!(TaskStatus::validate_transition(Paused, Uploading).is_ok());
        assert!(TaskStatus::validate_transition(Paused, Cancelled).is_ok());
    }

    #[test]
    fn no_op_transition_always_allowed() {
        for s in [Idle, Hashing, Uploading, Paused, Success, Error, Cancelled] {
            assert!(TaskStatus::validate_transition(s, s).is_ok());
        }
    }

    #[test]
    fn terminal_states_reject_outgoing_transitions() {
        assert!(TaskStatus::validate_transition(Success, Uploading).is_err());
        assert!(TaskStatus::validate_transition(Error, Uploading).is_err());
        assert!(TaskStatus::validate_transition(Cancelled, Uploading).is_err());
    }

    #[test]
    fn pause_on_idle_is_rejected() {
        assert!(TaskStatus::validate_transition(Idle, Paused).is_err());
    }
}
