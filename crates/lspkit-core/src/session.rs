//! Session lifecycle state machine.
//!
//! A server session moves strictly forward: `Uninitialized` until the
//! initialize request arrives, `Initializing` while the handshake runs,
//! `Initialized` for the working lifetime, `ShuttingDown` after the
//! shutdown request, and `Exited` once the exit notification lands. The
//! exit notification is accepted from any state; whether shutdown came
//! first decides the process exit code.

use crate::error::{LspError, LspResult};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No initialize request received yet. Only `initialize` and `exit` are
    /// accepted.
    #[default]
    Uninitialized,
    /// The initialize request is being handled; the handshake has not
    /// completed.
    Initializing,
    /// The handshake completed; normal operation.
    Initialized,
    /// The shutdown request was answered; only `exit` is expected.
    ShuttingDown,
    /// The exit notification arrived; the session is over.
    Exited,
}

impl SessionState {
    /// Short name used in errors and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
            Self::ShuttingDown => "shutting-down",
            Self::Exited => "exited",
        }
    }

    /// Whether moving to `next` is a legal lifecycle step.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::Initializing)
                | (Self::Initializing, Self::Initialized)
                | (Self::Initialized, Self::ShuttingDown)
                // exit is accepted from anywhere
                | (
                    Self::Uninitialized
                        | Self::Initializing
                        | Self::Initialized
                        | Self::ShuttingDown,
                    Self::Exited,
                )
        )
    }

    /// Step to `next`, or fail with an invalid-state error.
    pub fn transition(&mut self, next: Self) -> LspResult<()> {
        if self.can_transition(next) {
            *self = next;
            Ok(())
        } else {
            Err(LspError::InvalidState {
                from: self.name(),
                to: next.name(),
            })
        }
    }

    /// Whether regular (non-handshake) traffic is accepted.
    #[must_use]
    pub const fn accepts_requests(self) -> bool {
        matches!(self, Self::Initialized)
    }

    /// The process exit code appropriate when leaving this state via exit.
    /// Zero only when shutdown was requested first.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::ShuttingDown | Self::Exited => 0,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = SessionState::default();
        state.transition(SessionState::Initializing).unwrap();
        state.transition(SessionState::Initialized).unwrap();
        state.transition(SessionState::ShuttingDown).unwrap();
        state.transition(SessionState::Exited).unwrap();
        assert_eq!(state, SessionState::Exited);
    }

    #[test]
    fn test_double_initialize_rejected() {
        let mut state = SessionState::Initializing;
        let err = state.transition(SessionState::Initializing).unwrap_err();
        assert!(matches!(err, LspError::InvalidState { .. }));
    }

    #[test]
    fn test_no_backward_steps() {
        let mut state = SessionState::ShuttingDown;
        assert!(state.transition(SessionState::Initialized).is_err());
        assert_eq!(state, SessionState::ShuttingDown);
    }

    #[test]
    fn test_exit_from_anywhere() {
        for start in [
            SessionState::Uninitialized,
            SessionState::Initializing,
            SessionState::Initialized,
            SessionState::ShuttingDown,
        ] {
            let mut state = start;
            state.transition(SessionState::Exited).unwrap();
        }
        let mut exited = SessionState::Exited;
        assert!(exited.transition(SessionState::Exited).is_err());
    }

    #[test]
    fn test_exit_code_requires_shutdown_first() {
        assert_eq!(SessionState::ShuttingDown.exit_code(), 0);
        assert_eq!(SessionState::Initialized.exit_code(), 1);
        assert_eq!(SessionState::Uninitialized.exit_code(), 1);
    }

    #[test]
    fn test_request_gating() {
        assert!(!SessionState::Uninitialized.accepts_requests());
        assert!(!SessionState::Initializing.accepts_requests());
        assert!(SessionState::Initialized.accepts_requests());
        assert!(!SessionState::ShuttingDown.accepts_requests());
    }
}
