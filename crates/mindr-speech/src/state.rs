//! Speech channel state machine with thread-safe transitions.
//!
//! Enforces valid state transitions for the listening lifecycle:
//! - Idle -> Listening (start)
//! - Listening -> Idle (stop, device end, or error)

use std::fmt;
use std::sync::{Arc, Mutex};

use mindr_core::MindrError;

/// Operational state of the speech channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeechState {
    /// Not listening. Ready to start.
    Idle,
    /// Actively listening for speech input.
    Listening,
}

impl fmt::Display for SpeechState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechState::Idle => write!(f, "Idle"),
            SpeechState::Listening => write!(f, "Listening"),
        }
    }
}

impl SpeechState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SpeechState) -> bool {
        matches!(
            (self, target),
            (SpeechState::Idle, SpeechState::Listening)
                | (SpeechState::Listening, SpeechState::Idle)
        )
    }
}

/// Thread-safe state machine for the speech channel.
///
/// All transitions are validated before being applied, returning an error
/// if the requested transition is not permitted.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<SpeechState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SpeechState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> SpeechState {
        *self.state.lock().expect("state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: SpeechState) -> Result<(), MindrError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Speech state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(MindrError::Speech(format!(
                "Invalid state transition: {} -> {}",
                *state, target
            )))
        }
    }

    /// Force the state machine back to Idle (device-driven end or recovery).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if *state != SpeechState::Idle {
            tracing::debug!("Speech state reset to Idle from {}", *state);
        }
        *state = SpeechState::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SpeechState::Idle.to_string(), "Idle");
        assert_eq!(SpeechState::Listening.to_string(), "Listening");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(SpeechState::Idle.can_transition_to(&SpeechState::Listening));
        assert!(SpeechState::Listening.can_transition_to(&SpeechState::Idle));
    }

    #[test]
    fn test_self_transitions_invalid() {
        assert!(!SpeechState::Idle.can_transition_to(&SpeechState::Idle));
        assert!(!SpeechState::Listening.can_transition_to(&SpeechState::Listening));
    }

    #[test]
    fn test_state_machine_cycle() {
        let sm = StateMachine::new();
        assert_eq!(sm.current(), SpeechState::Idle);

        sm.transition(SpeechState::Listening).unwrap();
        assert_eq!(sm.current(), SpeechState::Listening);

        sm.transition(SpeechState::Idle).unwrap();
        assert_eq!(sm.current(), SpeechState::Idle);
    }

    #[test]
    fn test_invalid_transition_reports_states() {
        let sm = StateMachine::new();
        let err = sm.transition(SpeechState::Idle).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Idle"));
        assert_eq!(sm.current(), SpeechState::Idle);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let sm = StateMachine::new();
        sm.transition(SpeechState::Listening).unwrap();
        sm.reset();
        assert_eq!(sm.current(), SpeechState::Idle);

        // Reset from Idle is a no-op.
        sm.reset();
        assert_eq!(sm.current(), SpeechState::Idle);
    }

    #[test]
    fn test_clone_is_shared() {
        let sm1 = StateMachine::new();
        let sm2 = sm1.clone();
        sm1.transition(SpeechState::Listening).unwrap();
        assert_eq!(sm2.current(), SpeechState::Listening);
    }
}
