//! Readout session state machine
//!
//! Tracks the phases of one request/identify/baud-switch/data-block exchange
//! so each step is only performed from the state that allows it.
//!
//! # State Transitions
//! ```text
//! Idle -> Requesting          (port opened, request written)
//! Requesting -> AwaitingIdentity
//! AwaitingIdentity -> SwitchingBaud
//! SwitchingBaud -> AwaitingDataBlock
//! AwaitingDataBlock -> Done
//! Idle -> AwaitingDataBlock   (listen-only sessions skip the handshake)
//! any non-terminal -> Failed
//! ```

use iec_core::{IecError, IecResult};

/// Phase of one readout exchange
///
/// The failure reason is not carried here; it travels in the `IecError`
/// returned alongside the transition to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing sent yet; port closed
    Idle,
    /// Port open at the initial rate, request line written
    Requesting,
    /// Waiting for the identification line
    AwaitingIdentity,
    /// Identity parsed; acknowledgement and rate change in progress
    SwitchingBaud,
    /// Waiting for the data block terminator
    AwaitingDataBlock,
    /// Block validated; terminal
    Done,
    /// Exchange aborted; terminal
    Failed,
}

impl SessionState {
    /// Whether the exchange has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }

    /// Validate a state transition
    ///
    /// # Returns
    /// `Ok(())` if the transition is part of the protocol sequence,
    /// `Err` otherwise
    pub fn validate_transition(&self, new_state: SessionState) -> IecResult<()> {
        let valid = match (*self, new_state) {
            (SessionState::Idle, SessionState::Requesting) => true,
            (SessionState::Requesting, SessionState::AwaitingIdentity) => true,
            (SessionState::AwaitingIdentity, SessionState::SwitchingBaud) => true,
            (SessionState::SwitchingBaud, SessionState::AwaitingDataBlock) => true,
            (SessionState::AwaitingDataBlock, SessionState::Done) => true,
            // Listen-only sessions go straight to the block read
            (SessionState::Idle, SessionState::AwaitingDataBlock) => true,
            // Failure is reachable from every non-terminal state
            (from, SessionState::Failed) if !from.is_terminal() => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(IecError::InvalidData(format!(
                "Invalid state transition: {:?} -> {:?}",
                self, new_state
            )))
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Requesting => "Requesting",
            SessionState::AwaitingIdentity => "AwaitingIdentity",
            SessionState::SwitchingBaud => "SwitchingBaud",
            SessionState::AwaitingDataBlock => "AwaitingDataBlock",
            SessionState::Done => "Done",
            SessionState::Failed => "Failed",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_sequence_is_valid() {
        let sequence = [
            SessionState::Idle,
            SessionState::Requesting,
            SessionState::AwaitingIdentity,
            SessionState::SwitchingBaud,
            SessionState::AwaitingDataBlock,
            SessionState::Done,
        ];
        for pair in sequence.windows(2) {
            assert!(pair[0].validate_transition(pair[1]).is_ok());
        }
    }

    #[test]
    fn test_failure_reachable_from_non_terminal() {
        for state in [
            SessionState::Idle,
            SessionState::Requesting,
            SessionState::AwaitingIdentity,
            SessionState::SwitchingBaud,
            SessionState::AwaitingDataBlock,
        ] {
            assert!(state.validate_transition(SessionState::Failed).is_ok());
        }
        assert!(
            SessionState::Done
                .validate_transition(SessionState::Failed)
                .is_err()
        );
    }

    #[test]
    fn test_skipping_states_is_invalid() {
        assert!(
            SessionState::Requesting
                .validate_transition(SessionState::AwaitingDataBlock)
                .is_err()
        );
        assert!(
            SessionState::Done
                .validate_transition(SessionState::Requesting)
                .is_err()
        );
    }
}
