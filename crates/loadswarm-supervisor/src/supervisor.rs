//! Lifecycle supervisor for one swarm on one host.

use std::time::Duration;

use loadswarm_core::{CoreError, SwarmCommand, SwarmId, SwarmReport, SwarmState, ValidatedSpec};
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::config::SupervisorConfig;
use crate::discovery::BrokerDiscovery;
use crate::error::SupervisorError;
use crate::handle::RemoteHandle;
use crate::poll::{poll_until, PollOutcome};

/// Owns the lifecycle of the `client-swarm` workers on one [`RemoteHandle`].
///
/// Lifecycle calls take `&mut self`, so only the task driving the instance
/// ever writes its state. Dropping a pending `start` or `wait_until_done`
/// future abandons the wait but leaves the remote workers running; only
/// [`Supervisor::stop`] kills them.
pub struct Supervisor<H, D> {
    handle: H,
    discovery: D,
    spec: ValidatedSpec,
    config: SupervisorConfig,
    report: SwarmReport,
    span: Span,
}

impl<H, D> Supervisor<H, D>
where
    H: RemoteHandle,
    D: BrokerDiscovery,
{
    /// Create a supervisor with the default [`SupervisorConfig`].
    pub fn new(handle: H, discovery: D, spec: ValidatedSpec) -> Self {
        let id = SwarmId::generate();
        let span = info_span!("swarm", id = %id, host = %handle.hostname());
        let report = SwarmReport::new(id, handle.hostname());
        Self {
            handle,
            discovery,
            spec,
            config: SupervisorConfig::default(),
            report,
            span,
        }
    }

    /// Builder method to replace the configuration.
    pub fn with_config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> &SwarmId {
        &self.report.id
    }

    pub fn state(&self) -> SwarmState {
        self.report.state
    }

    pub fn report(&self) -> &SwarmReport {
        &self.report
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Render the worker command line for the given brokers.
    pub fn command_for(&self, brokers: &[String]) -> SwarmCommand {
        SwarmCommand::new(&self.config.exe, brokers, &self.spec)
    }

    /// Force-kill any leftover workers and delete the stale log file.
    ///
    /// Nothing to kill and nothing to delete are both success. Refused while
    /// this instance has a launch in flight.
    pub async fn clean_prior_run(&self) -> Result<(), SupervisorError> {
        if self.state().is_active() {
            return Err(self.invalid_state("clean a prior run"));
        }
        self.clean_inner().instrument(self.span.clone()).await
    }

    async fn clean_inner(&self) -> Result<(), SupervisorError> {
        info!(exe = %self.config.exe, "Cleaning prior run");
        self.handle.kill(&self.config.exe, false).await?;

        let log_path = self.config.log_path.as_str();
        if self.handle.file_exists(log_path).await? {
            self.handle.remove_file(log_path).await?;
            debug!(path = %log_path, "Removed stale log");
        }
        Ok(())
    }

    /// Launch the swarm and wait up to the configured start timeout for it to
    /// come alive.
    pub async fn start(&mut self) -> Result<SwarmState, SupervisorError> {
        let timeout = self.config.start_timeout;
        self.start_within(timeout).await
    }

    /// Launch the swarm and wait up to `timeout` for it to come alive.
    ///
    /// Only valid on a fresh instance. On timeout or probe failure the
    /// instance is Failed and a new one must be built to retry.
    pub async fn start_within(&mut self, timeout: Duration) -> Result<SwarmState, SupervisorError> {
        let span = self.span.clone();
        self.start_inner(timeout).instrument(span).await
    }

    async fn start_inner(&mut self, timeout: Duration) -> Result<SwarmState, SupervisorError> {
        if !self.state().can_transition_to(SwarmState::Starting) {
            return Err(self.invalid_state("start"));
        }

        let brokers = self.discovery.brokers().await?;
        if brokers.is_empty() {
            return Err(
                CoreError::InvalidConfig("broker discovery returned no addresses".to_string())
                    .into(),
            );
        }

        let command = self.command_for(&brokers);
        let launch = command.launch_line(&self.config.control_dir);
        info!(command = %command.render(), "Launching swarm");

        self.report.start(command.render())?;
        if let Err(e) = self.handle.execute(&launch).await {
            warn!(error = %e, "Launch command failed");
            self.report.fail(e.to_string())?;
            return Err(e.into());
        }

        let handle = &self.handle;
        let exe = self.config.exe.as_str();
        let outcome = poll_until(
            move || probe_alive(handle, exe),
            self.config.start_poll_interval,
            timeout,
        )
        .await;

        match outcome {
            Ok(PollOutcome::Satisfied { elapsed, attempts }) => {
                self.report.run()?;
                info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    attempts, "Swarm is running"
                );
                Ok(SwarmState::Running)
            }
            Ok(PollOutcome::TimedOut { elapsed, attempts }) => {
                let err = SupervisorError::StartTimeout {
                    host: self.handle.hostname().to_string(),
                    elapsed,
                };
                warn!(attempts, error = %err, "Swarm never came alive");
                self.report.fail(err.to_string())?;
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "Start aborted by probe failure");
                self.report.fail(err.to_string())?;
                Err(err)
            }
        }
    }

    /// Point-in-time liveness check. Never changes state.
    pub async fn is_alive(&self) -> Result<bool, SupervisorError> {
        probe_alive(&self.handle, &self.config.exe)
            .instrument(self.span.clone())
            .await
    }

    /// Wait up to the configured wait timeout for the swarm to exit.
    pub async fn wait_until_done(&mut self) -> Result<bool, SupervisorError> {
        let timeout = self.config.wait_timeout;
        self.wait_until_done_within(timeout).await
    }

    /// Wait up to `timeout` for every worker to exit on its own.
    ///
    /// Returns `Ok(true)` once the liveness probe reports false. A
    /// `WaitTimeout` leaves the workers running and the instance Running.
    pub async fn wait_until_done_within(
        &mut self,
        timeout: Duration,
    ) -> Result<bool, SupervisorError> {
        let span = self.span.clone();
        self.wait_inner(timeout).instrument(span).await
    }

    async fn wait_inner(&mut self, timeout: Duration) -> Result<bool, SupervisorError> {
        match self.state() {
            SwarmState::Stopped => return Ok(true),
            SwarmState::Running => {}
            _ => return Err(self.invalid_state("wait for")),
        }

        let handle = &self.handle;
        let exe = self.config.exe.as_str();
        let outcome = poll_until(
            move || {
                let probe = probe_alive(handle, exe);
                async move { probe.await.map(|alive| !alive) }
            },
            self.config.wait_poll_interval,
            timeout,
        )
        .await?;

        match outcome {
            PollOutcome::Satisfied { elapsed, .. } => {
                self.report.stop()?;
                info!(elapsed_ms = elapsed.as_millis() as u64, "Swarm finished");
                Ok(true)
            }
            PollOutcome::TimedOut { elapsed, .. } => {
                let err = SupervisorError::WaitTimeout {
                    host: self.handle.hostname().to_string(),
                    elapsed,
                };
                warn!(error = %err, "Swarm outlived wait deadline");
                Err(err)
            }
        }
    }

    /// Force-kill the workers.
    ///
    /// Safe to call unconditionally on teardown: before start it does
    /// nothing, and after the workers are gone the kill finds nothing.
    pub async fn stop(&mut self) -> Result<(), SupervisorError> {
        if self.state() == SwarmState::NotStarted {
            debug!(parent: &self.span, "Stop before start, nothing to do");
            return Ok(());
        }

        let span = self.span.clone();
        self.stop_inner().instrument(span).await
    }

    async fn stop_inner(&mut self) -> Result<(), SupervisorError> {
        info!(prior = %self.state(), "Stopping swarm");
        self.handle.kill(&self.config.exe, false).await?;
        self.report.stop()?;
        Ok(())
    }

    /// Consume the supervisor and return its final report.
    pub fn into_report(self) -> SwarmReport {
        self.report
    }

    fn invalid_state(&self, operation: &str) -> SupervisorError {
        SupervisorError::InvalidState {
            state: self.state().to_string(),
            operation: operation.to_string(),
        }
    }
}

async fn probe_alive<H>(handle: &H, exe: &str) -> Result<bool, SupervisorError>
where
    H: RemoteHandle + ?Sized,
{
    let alive = handle
        .process_exists(exe)
        .await
        .map_err(|source| SupervisorError::Probe {
            host: handle.hostname().to_string(),
            source,
        })?;
    debug!(alive, "Liveness probe");
    Ok(alive)
}
