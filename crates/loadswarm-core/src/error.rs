//! Core domain errors.

use thiserror::Error;

/// Core domain errors for loadswarm.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Worker spec rejected before any remote call.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}
