//! Loop state transitions

use std::fmt;

/// Reconciliation loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// Waiting for a trigger
    Idle,
    /// One line read outstanding
    FetchInFlight,
    /// Settling after a read; fetch triggers are queued
    Cooldown,
}

/// Rejected state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    /// No edge from `from` to `to`
    IllegalTransition {
        /// Current state
        from: LoopState,
        /// Requested state
        to: LoopState,
    },
}

impl fmt::Display for StateMachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalTransition { from, to } => {
                write!(f, "illegal loop transition {from:?} -> {to:?}")
            }
        }
    }
}

impl std::error::Error for StateMachineError {}

/// Validates a loop state transition.
pub fn validate_transition(from: LoopState, to: LoopState) -> Result<(), StateMachineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// States reachable from `from`
pub fn allowed_transitions(from: LoopState) -> &'static [LoopState] {
    use LoopState::*;
    match from {
        Idle => &[FetchInFlight],
        FetchInFlight => &[Cooldown],
        Cooldown => &[Idle],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LoopState::*;

    #[test]
    fn cycle_is_allowed() {
        assert!(validate_transition(Idle, FetchInFlight).is_ok());
        assert!(validate_transition(FetchInFlight, Cooldown).is_ok());
        assert!(validate_transition(Cooldown, Idle).is_ok());
    }

    #[test]
    fn second_fetch_is_illegal() {
        assert_eq!(
            validate_transition(FetchInFlight, FetchInFlight),
            Err(StateMachineError::IllegalTransition {
                from: FetchInFlight,
                to: FetchInFlight
            })
        );
        assert!(validate_transition(Cooldown, FetchInFlight).is_err());
        assert!(validate_transition(Idle, Cooldown).is_err());
    }
}
