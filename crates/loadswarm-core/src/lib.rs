//! loadswarm Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Remote transports (SSH or otherwise)
//! - Async runtimes
//!
//! Everything needed to describe a swarm run and render its command line
//! lives here, so it can be asserted on without touching a host.

pub mod command;
pub mod error;
pub mod ids;
pub mod report;
pub mod spec;
pub mod status;

// Re-export commonly used types
pub use command::{SwarmCommand, DEFAULT_EXE};
pub use error::CoreError;
pub use ids::SwarmId;
pub use report::SwarmReport;
pub use spec::{ValidatedSpec, WorkerSpec};
pub use status::SwarmState;
