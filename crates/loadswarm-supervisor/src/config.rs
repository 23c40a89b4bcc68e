//! Supervisor configuration.

use std::time::Duration;

use loadswarm_core::DEFAULT_EXE;

/// Supervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Worker binary name, used to launch, probe and kill.
    pub exe: String,

    /// Worker log file on the remote host.
    pub log_path: String,

    /// Directory holding the remote `start.sh` control script.
    pub control_dir: String,

    /// Budget for the first positive liveness probe.
    pub start_timeout: Duration,

    /// Cadence of the start liveness probe.
    pub start_poll_interval: Duration,

    /// Default budget for natural completion.
    pub wait_timeout: Duration,

    /// Cadence of the completion probe.
    pub wait_poll_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            exe: DEFAULT_EXE.to_string(),
            log_path: "/opt/remote/var/client-swarm.log".to_string(),
            control_dir: "/opt/remote/control".to_string(),
            start_timeout: Duration::from_secs(600),
            start_poll_interval: Duration::from_secs(1),
            wait_timeout: Duration::from_secs(600),
            wait_poll_interval: Duration::from_secs(5),
        }
    }
}
