//! Remote lifecycle supervisor for `client-swarm` load generators.
//!
//! A [`Supervisor`] owns one swarm on one remote host. It renders the worker
//! command line, launches it through a [`RemoteHandle`], polls for liveness,
//! waits for natural completion and force-stops it on teardown.
//!
//! # Example
//!
//! ```rust,no_run
//! use loadswarm_core::WorkerSpec;
//! use loadswarm_supervisor::{SshHandle, SshTarget, StaticBrokers, Supervisor};
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let spec = WorkerSpec::new("t1", 4, 1000).validate()?;
//!     let handle = SshHandle::new(SshTarget::new("10.0.0.7").with_user("ubuntu"));
//!     let brokers = StaticBrokers::new(vec!["10.0.0.1:9092".to_string()]);
//!
//!     let mut swarm = Supervisor::new(handle, brokers, spec);
//!     swarm.clean_prior_run().await?;
//!     swarm.start().await?;
//!     let outcome = swarm.wait_until_done().await;
//!     swarm.stop().await?;
//!     outcome?;
//!     Ok(())
//! }
//! ```

mod config;
mod discovery;
mod error;
mod handle;
mod poll;
mod supervisor;

// Re-export main types
pub use config::SupervisorConfig;
pub use discovery::{BrokerDiscovery, StaticBrokers};
pub use error::{DiscoveryError, SupervisorError, TransportError};
pub use handle::{MemoryHandle, RemoteCall, RemoteHandle, SshHandle, SshTarget};
pub use poll::{poll_until, PollOutcome};
pub use supervisor::Supervisor;
