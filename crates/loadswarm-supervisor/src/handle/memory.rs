//! In-memory [`RemoteHandle`] for tests.
//!
//! Records every call and serves scripted liveness answers, making it easy to
//! write deterministic tests for supervisor lifecycles.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::RemoteHandle;
use crate::error::TransportError;

/// One call made against a [`MemoryHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Execute(String),
    ExecuteCapture(String),
    ProcessExists(String),
    Kill { name: String, graceful: bool },
    FileExists(String),
    RemoveFile(String),
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<RemoteCall>,
    probes: VecDeque<Result<bool, String>>,
    alive: bool,
    files: HashSet<String>,
    failing: bool,
    capture_output: Vec<u8>,
}

/// A fake host.
///
/// Liveness answers come from the scripted probe queue first; once it is
/// drained, the handle reports its `alive` flag, which [`RemoteHandle::kill`]
/// clears.
#[derive(Debug)]
pub struct MemoryHandle {
    hostname: String,
    state: Mutex<State>,
}

impl MemoryHandle {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Set the answer given once the probe script is drained.
    pub fn with_alive(self, alive: bool) -> Self {
        self.lock().alive = alive;
        self
    }

    /// Queue liveness answers, consumed one per probe.
    pub fn with_probe_sequence(self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.lock().probes.extend(answers.into_iter().map(Ok));
        self
    }

    /// Queue a probe that fails at the transport level.
    pub fn with_probe_error(self, message: impl Into<String>) -> Self {
        self.lock().probes.push_back(Err(message.into()));
        self
    }

    /// Pretend `path` exists on the host.
    pub fn with_file(self, path: impl Into<String>) -> Self {
        self.lock().files.insert(path.into());
        self
    }

    /// Make every non-probe call fail as if the connection dropped.
    pub fn with_failing_commands(self) -> Self {
        self.lock().failing = true;
        self
    }

    /// Bytes returned by [`RemoteHandle::execute_capture`].
    pub fn with_capture_output(self, output: impl Into<Vec<u8>>) -> Self {
        self.lock().capture_output = output.into();
        self
    }

    /// Flip the fallback liveness answer mid-test.
    pub fn set_alive(&self, alive: bool) {
        self.lock().alive = alive;
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Commands passed to `execute`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Execute(command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn probe_count(&self) -> usize {
        self.count(|call| matches!(call, RemoteCall::ProcessExists(_)))
    }

    pub fn kill_count(&self) -> usize {
        self.count(|call| matches!(call, RemoteCall::Kill { .. }))
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.lock().files.contains(path)
    }

    fn count(&self, pred: impl Fn(&RemoteCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| pred(call)).count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `call` and fail it if the handle is set to fail.
    fn record(&self, call: RemoteCall) -> Result<MutexGuard<'_, State>, TransportError> {
        let mut state = self.lock();
        let described = format!("{:?}", call);
        state.calls.push(call);
        if state.failing {
            return Err(connection_lost(described, "connection refused"));
        }
        Ok(state)
    }
}

fn connection_lost(command: String, stderr: &str) -> TransportError {
    TransportError::CommandFailed {
        command,
        code: Some(255),
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl RemoteHandle for MemoryHandle {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    async fn execute(&self, command: &str) -> Result<(), TransportError> {
        drop(self.record(RemoteCall::Execute(command.to_string()))?);
        Ok(())
    }

    async fn execute_capture(&self, command: &str) -> Result<Vec<u8>, TransportError> {
        let state = self.record(RemoteCall::ExecuteCapture(command.to_string()))?;
        Ok(state.capture_output.clone())
    }

    async fn process_exists(&self, name: &str) -> Result<bool, TransportError> {
        let mut state = self.lock();
        state.calls.push(RemoteCall::ProcessExists(name.to_string()));
        match state.probes.pop_front() {
            Some(Ok(alive)) => Ok(alive),
            Some(Err(message)) => Err(connection_lost(format!("process_exists {}", name), &message)),
            None => Ok(state.alive),
        }
    }

    async fn kill(&self, name: &str, graceful: bool) -> Result<(), TransportError> {
        let mut state = self.record(RemoteCall::Kill {
            name: name.to_string(),
            graceful,
        })?;
        state.alive = false;
        Ok(())
    }

    async fn file_exists(&self, path: &str) -> Result<bool, TransportError> {
        let state = self.record(RemoteCall::FileExists(path.to_string()))?;
        Ok(state.files.contains(path))
    }

    async fn remove_file(&self, path: &str) -> Result<(), TransportError> {
        let mut state = self.record(RemoteCall::RemoveFile(path.to_string()))?;
        state.files.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_script_then_fallback() {
        let handle = MemoryHandle::new("h")
            .with_probe_sequence([false, true])
            .with_alive(true);

        assert!(!handle.process_exists("w").await.unwrap());
        assert!(handle.process_exists("w").await.unwrap());
        assert!(handle.process_exists("w").await.unwrap());

        handle.kill("w", false).await.unwrap();
        assert!(!handle.process_exists("w").await.unwrap());
        assert_eq!(handle.probe_count(), 4);
        assert_eq!(handle.kill_count(), 1);
    }

    #[tokio::test]
    async fn test_execute_releases_state() {
        let handle = MemoryHandle::new("h").with_alive(true);
        handle.execute("launch").await.unwrap();
        handle.execute("launch again").await.unwrap();
        assert!(handle.process_exists("w").await.unwrap());
        assert_eq!(
            handle.executed(),
            vec!["launch".to_string(), "launch again".to_string()]
        );
    }

    #[tokio::test]
    async fn test_probe_error_is_not_false() {
        let handle = MemoryHandle::new("h").with_probe_error("broken pipe");
        let err = handle.process_exists("w").await.unwrap_err();
        assert!(matches!(err, TransportError::CommandFailed { ref stderr, .. } if stderr == "broken pipe"));
    }

    #[tokio::test]
    async fn test_files_and_failures() {
        let handle = MemoryHandle::new("h").with_file("/var/log/x");
        assert!(handle.file_exists("/var/log/x").await.unwrap());
        handle.remove_file("/var/log/x").await.unwrap();
        assert!(!handle.has_file("/var/log/x"));
        handle.remove_file("/var/log/x").await.unwrap();

        let capturing = MemoryHandle::new("h").with_capture_output("YES\n");
        assert_eq!(capturing.execute_capture("alive").await.unwrap(), b"YES\n".to_vec());

        let failing = MemoryHandle::new("h").with_failing_commands();
        assert!(failing.execute("true").await.is_err());
        assert_eq!(failing.calls(), vec![RemoteCall::Execute("true".to_string())]);
    }
}
