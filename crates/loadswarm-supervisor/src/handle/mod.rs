//! Remote execution seam.
//!
//! The supervisor never opens its own session: it is handed a
//! [`RemoteHandle`] bound to exactly one host.

mod memory;
mod ssh;

use async_trait::async_trait;

use crate::error::TransportError;

pub use memory::{MemoryHandle, RemoteCall};
pub use ssh::{SshHandle, SshTarget};

/// Capability interface over one remote host.
///
/// Implementations must treat "nothing to act on" as success in [`kill`] and
/// [`remove_file`], so teardown paths can call them unconditionally.
///
/// [`kill`]: RemoteHandle::kill
/// [`remove_file`]: RemoteHandle::remove_file
#[async_trait]
pub trait RemoteHandle: Send + Sync {
    /// Identity of the host, used in logs and errors.
    fn hostname(&self) -> &str;

    /// Run a shell command, discarding its output.
    async fn execute(&self, command: &str) -> Result<(), TransportError>;

    /// Run a shell command and return its stdout.
    async fn execute_capture(&self, command: &str) -> Result<Vec<u8>, TransportError>;

    /// Whether at least one process named `name` is running.
    async fn process_exists(&self, name: &str) -> Result<bool, TransportError>;

    /// Signal every process named `name`. The absence of any is success.
    async fn kill(&self, name: &str, graceful: bool) -> Result<(), TransportError>;

    /// Whether `path` exists on the host.
    async fn file_exists(&self, path: &str) -> Result<bool, TransportError>;

    /// Remove `path`. A missing file is success.
    async fn remove_file(&self, path: &str) -> Result<(), TransportError>;
}
