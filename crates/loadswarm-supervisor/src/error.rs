//! Error types for the swarm supervisor.

use std::time::Duration;

use loadswarm_core::CoreError;
use thiserror::Error;

/// Failures of the remote execution transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The local transport client could not be started.
    #[error("Failed to spawn transport client: {0}")]
    Spawn(#[from] std::io::Error),

    /// The remote command ran but reported failure.
    #[error("Remote command `{command}` failed with status {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The remote command did not finish within its deadline.
    #[error("Remote command `{command}` did not finish within {limit:?}")]
    Timeout { command: String, limit: Duration },
}

/// The target system could not report its broker addresses.
#[derive(Debug, Error)]
#[error("Broker discovery failed: {0}")]
pub struct DiscoveryError(pub String);

/// Errors surfaced by [`crate::Supervisor`] operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Rejected before any remote call.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Operation not allowed in the current lifecycle state.
    #[error("Cannot {operation} while swarm is {state}")]
    InvalidState { state: String, operation: String },

    /// The liveness check itself failed. Says nothing about the process.
    #[error("Liveness probe on {host} failed: {source}")]
    Probe {
        host: String,
        #[source]
        source: TransportError,
    },

    /// Liveness was never confirmed within the start budget.
    #[error("Swarm on {host} failed to start within {elapsed:?}")]
    StartTimeout { host: String, elapsed: Duration },

    /// The swarm was still alive at the wait deadline. It is left running.
    #[error("Swarm on {host} still running after {elapsed:?}")]
    WaitTimeout { host: String, elapsed: Duration },

    /// Any other transport failure (launch, stop, cleanup).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Broker discovery failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

impl SupervisorError {
    /// Returns true for the two deadline errors.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::StartTimeout { .. } | Self::WaitTimeout { .. })
    }

    /// Returns true if the same call may succeed when simply repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Probe { .. } | Self::WaitTimeout { .. })
    }
}

impl From<CoreError> for SupervisorError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            CoreError::InvalidStateTransition { from, to } => Self::InvalidState {
                state: from,
                operation: format!("move to {}", to),
            },
        }
    }
}
