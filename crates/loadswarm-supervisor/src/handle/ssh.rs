//! [`RemoteHandle`] over the system `ssh` client.

use std::future::Future;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::RemoteHandle;
use crate::error::TransportError;

/// `pkill`/`test` exit status meaning "nothing matched".
const NO_MATCH: i32 = 1;

/// Upper bound on one ssh invocation, connect included.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// SSH coordinates of one remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// Hostname or IP address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// SSH user. Falls back to the ssh client's own default.
    pub user: Option<String>,
    /// Path to an SSH private key, if not using the default.
    pub ssh_key: Option<String>,
    /// Seconds before the ssh client gives up connecting.
    pub connect_timeout_secs: u64,
}

impl SshTarget {
    /// Create a target on port 22 with the client's default user and key.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: None,
            ssh_key: None,
            connect_timeout_secs: 10,
        }
    }

    /// Builder method to set the SSH user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Builder method to set the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method to set the identity file.
    pub fn with_ssh_key(mut self, key: impl Into<String>) -> Self {
        self.ssh_key = Some(key.into());
        self
    }

    /// `user@host`, or just `host` without a user.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// Base SSH arguments (port, options, key, destination) without a command.
    pub fn ssh_base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
        ];
        if let Some(key) = &self.ssh_key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args.push(self.destination());
        args
    }
}

/// Runs every operation as one `ssh <target> <command>` invocation.
#[derive(Debug, Clone)]
pub struct SshHandle {
    target: SshTarget,
    ssh_program: String,
    control_dir: Option<String>,
    command_timeout: Duration,
}

impl SshHandle {
    pub fn new(target: SshTarget) -> Self {
        Self {
            target,
            ssh_program: "ssh".to_string(),
            control_dir: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Probe and kill through `<dir>/alive.sh` and `<dir>/stop.sh` instead
    /// of `pgrep` and `pkill`.
    pub fn with_control_dir(mut self, dir: impl Into<String>) -> Self {
        self.control_dir = Some(dir.into());
        self
    }

    /// Builder method to bound each remote command.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Use a different ssh client binary.
    pub fn with_ssh_program(mut self, program: impl Into<String>) -> Self {
        self.ssh_program = program.into();
        self
    }

    async fn run(&self, command: &str) -> Result<Output, TransportError> {
        let mut cmd = Command::new(&self.ssh_program);
        cmd.args(self.target.ssh_base_args())
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(host = %self.target.host, command = %command, "Running remote command");
        let output = bounded(command, self.command_timeout, cmd.output()).await?;
        debug!(
            host = %self.target.host,
            code = ?output.status.code(),
            stdout_len = output.stdout.len(),
            "Remote command finished"
        );
        Ok(output)
    }

    /// Run `command`, accepting only the given exit codes.
    async fn run_expecting(
        &self,
        command: &str,
        accepted: &[i32],
    ) -> Result<Output, TransportError> {
        let output = self.run(command).await?;
        match output.status.code() {
            Some(code) if accepted.contains(&code) => Ok(output),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                warn!(host = %self.target.host, code = ?code, stderr = %stderr, "Remote command failed");
                Err(TransportError::CommandFailed {
                    command: command.to_string(),
                    code,
                    stderr,
                })
            }
        }
    }

    fn alive_command(&self, name: &str) -> String {
        match &self.control_dir {
            Some(dir) => control_script(dir, "alive.sh", name),
            None => format!(
                "pgrep -f {} >/dev/null && echo YES || echo NO",
                shell_quote(&process_pattern(name))
            ),
        }
    }

    /// The control script picks its own signal; `graceful` only applies to
    /// the `pkill` fallback.
    fn kill_command(&self, name: &str, graceful: bool) -> String {
        match &self.control_dir {
            Some(dir) => control_script(dir, "stop.sh", name),
            None => {
                let signal = if graceful { "TERM" } else { "KILL" };
                format!("pkill -{} -f {}", signal, shell_quote(&process_pattern(name)))
            }
        }
    }
}

#[async_trait]
impl RemoteHandle for SshHandle {
    fn hostname(&self) -> &str {
        &self.target.host
    }

    async fn execute(&self, command: &str) -> Result<(), TransportError> {
        self.run_expecting(command, &[0]).await?;
        Ok(())
    }

    async fn execute_capture(&self, command: &str) -> Result<Vec<u8>, TransportError> {
        Ok(self.run_expecting(command, &[0]).await?.stdout)
    }

    async fn process_exists(&self, name: &str) -> Result<bool, TransportError> {
        let stdout = self.execute_capture(&self.alive_command(name)).await?;
        Ok(reports_alive(&stdout))
    }

    async fn kill(&self, name: &str, graceful: bool) -> Result<(), TransportError> {
        self.run_expecting(&self.kill_command(name, graceful), &[0, NO_MATCH])
            .await?;
        Ok(())
    }

    async fn file_exists(&self, path: &str) -> Result<bool, TransportError> {
        let command = format!("test -e {}", shell_quote(path));
        let output = self.run_expecting(&command, &[0, NO_MATCH]).await?;
        Ok(output.status.success())
    }

    async fn remove_file(&self, path: &str) -> Result<(), TransportError> {
        self.execute(&format!("rm -f {}", shell_quote(path))).await
    }
}

/// Wait for `output`, giving up after `limit`. Dropping the future kills the
/// ssh client.
async fn bounded<F>(command: &str, limit: Duration, output: F) -> Result<Output, TransportError>
where
    F: Future<Output = std::io::Result<Output>>,
{
    match tokio::time::timeout(limit, output).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(TransportError::Timeout {
            command: command.to_string(),
            limit,
        }),
    }
}

fn control_script(dir: &str, script: &str, name: &str) -> String {
    format!(
        "bash {} {}",
        shell_quote(&format!("{}/{}", dir.trim_end_matches('/'), script)),
        shell_quote(name)
    )
}

/// Extended regex for `pgrep -f`/`pkill -f` matching `name` as a whole word
/// of a full command line, with or without a leading directory.
///
/// Unlike `-x`, this is not limited to the 15-byte kernel comm name. The
/// pattern never matches its own text, so the remote shell running it is
/// not counted.
fn process_pattern(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(
            c,
            '.' | '[' | ']' | '(' | ')' | '*' | '+' | '?' | '{' | '}' | '|' | '^' | '$' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("(^|[/ ]){}( |$)", escaped)
}

/// The control scripts answer `YES` when the process is present.
fn reports_alive(stdout: &[u8]) -> bool {
    String::from_utf8_lossy(stdout).contains("YES")
}

/// Single-quote `raw` for a POSIX shell.
fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "'\\''"))
}
