//! Lifecycle state of a supervised swarm.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Lifecycle state of one swarm instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwarmState {
    /// Instance created, nothing issued on the host yet.
    #[default]
    NotStarted,
    /// Launch command issued, waiting for the first positive liveness probe.
    Starting,
    /// Liveness confirmed.
    Running,
    /// Workers exited on their own or were killed.
    Stopped,
    /// Liveness was never confirmed.
    Failed,
}

impl SwarmState {
    /// Returns true if the instance can never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// Returns true if a launch has been issued and not yet torn down.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    /// Whether `self -> next` is an edge of the lifecycle.
    pub fn can_transition_to(&self, next: SwarmState) -> bool {
        use SwarmState::*;
        matches!(
            (self, next),
            (NotStarted, Starting)
                | (Starting, Running)
                | (Starting, Failed)
                | (Starting, Stopped)
                | (Running, Stopped)
                | (Failed, Stopped)
                | (Stopped, Stopped)
        )
    }

    /// Validate and return the next state.
    pub fn transition(self, next: SwarmState) -> Result<SwarmState, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for SwarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_not_started() {
        assert_eq!(SwarmState::default(), SwarmState::NotStarted);
    }

    #[test]
    fn test_happy_path_transitions() {
        let state = SwarmState::NotStarted
            .transition(SwarmState::Starting)
            .and_then(|s| s.transition(SwarmState::Running))
            .and_then(|s| s.transition(SwarmState::Stopped))
            .unwrap();
        assert_eq!(state, SwarmState::Stopped);
    }

    #[test]
    fn test_no_restart_from_terminal() {
        assert!(SwarmState::Stopped.transition(SwarmState::Starting).is_err());
        assert!(SwarmState::Failed.transition(SwarmState::Running).is_err());
        assert!(SwarmState::Failed.transition(SwarmState::Starting).is_err());
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = SwarmState::NotStarted
            .transition(SwarmState::Running)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidStateTransition {
                from: "not_started".to_string(),
                to: "running".to_string(),
            }
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SwarmState::NotStarted).unwrap();
        assert_eq!(json, "\"NOT_STARTED\"");
    }
}
