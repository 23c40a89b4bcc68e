//! loadswarm CLI - supervise client-swarm load generators on a remote host.

use std::error::Error;

use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use loadswarm_core::SwarmCommand;
use loadswarm_supervisor::{
    RemoteHandle, SshHandle, StaticBrokers, Supervisor, SupervisorError,
};

mod args;

use args::{Cli, Commands, SpecArgs};

type Swarm = Supervisor<SshHandle, StaticBrokers>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing()?;

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { spec, launch } => {
            render(&cli, spec, *launch)?;
        }
        Commands::Start { spec, no_clean } => {
            let mut swarm = build_swarm(&cli, spec)?;
            if !no_clean {
                swarm.clean_prior_run().await?;
            }
            let started = swarm.start().await;
            print_report(&swarm)?;
            started?;
        }
        Commands::Status => {
            let handle = build_handle(&cli)?;
            let alive = handle.process_exists(&cli.exe).await?;
            println!("{}", json!({ "host": handle.hostname(), "alive": alive }));
        }
        Commands::Kill => {
            let handle = build_handle(&cli)?;
            handle.kill(&cli.exe, false).await?;
            info!(host = %handle.hostname(), exe = %cli.exe, "Killed workers");
        }
        Commands::Run { spec, no_clean } => {
            let mut swarm = build_swarm(&cli, spec)?;
            if !no_clean {
                swarm.clean_prior_run().await?;
            }

            let outcome: Result<(), Box<dyn Error>> = tokio::select! {
                result = drive(&mut swarm) => result.map_err(Into::into),
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted");
                    Err("interrupted".into())
                }
            };

            // Abandoning the wait leaves the workers behind; always stop.
            let stopped = swarm.stop().await;
            print_report(&swarm)?;
            outcome?;
            stopped?;
        }
    }

    Ok(())
}

fn init_tracing() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn render(cli: &Cli, spec: &SpecArgs, launch: bool) -> Result<(), Box<dyn Error>> {
    if cli.brokers.is_empty() {
        return Err("--brokers is required to render a command".into());
    }
    let spec = spec.to_worker_spec()?.validate()?;
    let command = SwarmCommand::new(&cli.exe, &cli.brokers, &spec);
    if launch {
        println!("{}", command.launch_line(&cli.control_dir));
    } else {
        println!("{}", command.render());
    }
    Ok(())
}

fn build_handle(cli: &Cli) -> Result<SshHandle, Box<dyn Error>> {
    Ok(SshHandle::new(cli.ssh_target()?)
        .with_control_dir(&cli.control_dir)
        .with_command_timeout(cli.command_timeout()))
}

fn build_swarm(cli: &Cli, spec: &SpecArgs) -> Result<Swarm, Box<dyn Error>> {
    let spec = spec.to_worker_spec()?.validate()?;
    let handle = build_handle(cli)?;
    let brokers = StaticBrokers::new(cli.brokers.clone());
    Ok(Supervisor::new(handle, brokers, spec).with_config(cli.supervisor_config()))
}

/// Start the swarm and wait for it to finish.
async fn drive(swarm: &mut Swarm) -> Result<(), SupervisorError> {
    swarm.start().await?;
    swarm.wait_until_done().await?;
    Ok(())
}

fn print_report(swarm: &Swarm) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(swarm.report())?);
    Ok(())
}
