//! Connection state machine
//!
//! ```text
//! Disconnected → Connected ⇄ Reconnecting
//!       ↘            ↓            ↙
//!              Closed (terminal)
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Lifecycle state of a [`Session`](crate::Session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Never connected, or the first connect failed
    #[default]
    Disconnected,
    /// Logged in and exchanging frames
    Connected,
    /// Connection lost; the session is trying to get it back
    Reconnecting,
    /// Shut down for good
    Closed,
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid state transition from {from:?} to {to:?}: {reason}")]
pub struct InvalidTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub reason: &'static str,
}

impl ConnectionState {
    /// Attempt a transition to a new state.
    ///
    /// Transitions to the current state are accepted and change nothing,
    /// except out of `Closed`, which accepts nothing at all.
    pub fn try_transition(self, to: ConnectionState) -> Result<ConnectionState, InvalidTransition> {
        use ConnectionState::*;

        let valid = match (self, to) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Disconnected, Connected) => true,
            (Disconnected, Reconnecting) => true,
            (Connected, Reconnecting) => true,
            (Reconnecting, Connected) => true,
            (from, to) if from == to => true,
            _ => false,
        };

        if valid {
            Ok(to)
        } else {
            Err(InvalidTransition {
                from: self,
                to,
                reason: Self::transition_error_reason(self, to),
            })
        }
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition_to(self, to: ConnectionState) -> bool {
        self.try_transition(to).is_ok()
    }

    fn transition_error_reason(from: ConnectionState, to: ConnectionState) -> &'static str {
        use ConnectionState::*;

        match (from, to) {
            (Closed, _) => "Closed is terminal - session cannot recover",
            (_, Disconnected) => "Disconnected is only the initial state",
            _ => "Invalid state transition",
        }
    }

    /// Only a connected session makes its units available
    pub fn is_available(self) -> bool {
        self == ConnectionState::Connected
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delay after `attempt` consecutive failed reconnects, `base * 2^attempt`
/// capped at `max`.
pub fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    const ALL: [ConnectionState; 4] = [Disconnected, Connected, Reconnecting, Closed];

    #[test]
    fn test_closed_is_absorbing() {
        for to in ALL {
            let err = Closed.try_transition(to).unwrap_err();
            assert_eq!(err.from, Closed);
            assert_eq!(err.to, to);
            assert!(err.reason.contains("terminal"));
        }
    }

    #[test]
    fn test_closed_reachable_from_every_live_state() {
        for from in [Disconnected, Connected, Reconnecting] {
            assert_eq!(from.try_transition(Closed), Ok(Closed));
        }
    }

    #[test]
    fn test_reconnect_cycle() {
        assert!(Disconnected.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Reconnecting));
        assert!(Reconnecting.can_transition_to(Connected));
        assert!(Reconnecting.can_transition_to(Reconnecting));
    }

    #[test]
    fn test_cannot_return_to_disconnected() {
        assert!(!Connected.can_transition_to(Disconnected));
        assert!(!Reconnecting.can_transition_to(Disconnected));
    }

    #[test]
    fn test_only_connected_is_available() {
        assert!(Connected.is_available());
        assert!(!Disconnected.is_available());
        assert!(!Reconnecting.is_available());
        assert!(!Closed.is_available());
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(300);
        let delays: Vec<_> = (0..12).map(|n| backoff_delay(base, max, n)).collect();

        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[1], Duration::from_secs(2));
        assert_eq!(delays[4], Duration::from_secs(16));
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(delays[11], max);
    }

    #[test]
    fn test_backoff_survives_huge_attempts() {
        let max = Duration::from_secs(300);
        assert_eq!(backoff_delay(Duration::from_secs(1), max, 200), max);
    }
}
