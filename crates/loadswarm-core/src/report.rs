//! Point-in-time summary of a supervised swarm.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, SwarmId, SwarmState};

/// Summary of one swarm instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmReport {
    /// Instance identifier.
    pub id: SwarmId,

    /// Host the swarm runs on.
    pub host: String,

    /// Current lifecycle state.
    pub state: SwarmState,

    /// Rendered worker command line, once Start has built it.
    pub command: Option<String>,

    /// When the launch command was issued.
    pub started_at: Option<DateTime<Utc>>,

    /// When the swarm reached Stopped or Failed.
    pub finished_at: Option<DateTime<Utc>>,

    /// Error message if the start attempt failed.
    pub error_message: Option<String>,
}

impl SwarmReport {
    /// Create a new report for an instance that has not started.
    pub fn new(id: SwarmId, host: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
            state: SwarmState::NotStarted,
            command: None,
            started_at: None,
            finished_at: None,
            error_message: None,
        }
    }

    /// Mark the launch as issued.
    pub fn start(&mut self, command: String) -> Result<(), CoreError> {
        self.advance(SwarmState::Starting)?;
        self.command = Some(command);
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Mark liveness as confirmed.
    pub fn run(&mut self) -> Result<(), CoreError> {
        self.advance(SwarmState::Running)
    }

    /// Mark the swarm as stopped. Keeps the first finish time.
    pub fn stop(&mut self) -> Result<(), CoreError> {
        self.advance(SwarmState::Stopped)
    }

    /// Mark the start attempt as failed.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), CoreError> {
        self.advance(SwarmState::Failed)?;
        self.error_message = Some(error.into());
        Ok(())
    }

    /// Move along one lifecycle edge; the state is untouched on error.
    fn advance(&mut self, next: SwarmState) -> Result<(), CoreError> {
        self.state = self.state.transition(next)?;
        if self.state.is_terminal() {
            self.finished_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }
}
