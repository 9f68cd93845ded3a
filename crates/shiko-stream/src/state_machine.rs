use crate::error::StateMachineError;

/// Lifecycle of the streaming connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection; initial state
    Disconnected,
    /// Connect in progress
    Connecting,
    /// Reading frames
    Connected,
    /// Cancelled; terminal
    Stopped,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

/// Validates a state transition.
///
/// `Stopped` is reachable from every state and only through cancellation.
pub fn validate_transition(
    from: ConnectionState,
    to: ConnectionState,
) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: ConnectionState) -> Vec<ConnectionState> {
    use ConnectionState::*;
    match from {
        Disconnected => vec![Connecting, Stopped],
        Connecting => vec![Connected, Disconnected, Stopped],
        Connected => vec![Disconnected, Stopped],
        Stopped => vec![],
    }
}

fn allowed(from: ConnectionState, to: ConnectionState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
