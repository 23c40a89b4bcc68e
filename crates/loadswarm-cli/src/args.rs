//! Command line arguments.

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use loadswarm_core::{WorkerSpec, DEFAULT_EXE};
use loadswarm_supervisor::{SshTarget, SupervisorConfig};

/// loadswarm - run client-swarm load generators on a remote host
#[derive(Parser, Debug)]
#[command(name = "loadswarm")]
#[command(about = "Supervise client-swarm load generators over SSH", long_about = None)]
pub struct Cli {
    /// Host that runs the swarm
    #[arg(long)]
    pub host: Option<String>,

    /// SSH user
    #[arg(short, long)]
    pub user: Option<String>,

    /// SSH port
    #[arg(short, long, default_value_t = 22)]
    pub port: u16,

    /// SSH identity file
    #[arg(long)]
    pub ssh_key: Option<String>,

    /// Broker addresses of the system under test, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub brokers: Vec<String>,

    /// Worker binary name on the host
    #[arg(long, default_value = DEFAULT_EXE)]
    pub exe: String,

    /// Directory of the start.sh / alive.sh control scripts on the host
    #[arg(long, default_value = "/opt/remote/control")]
    pub control_dir: String,

    /// Worker log file on the host, removed before each start
    #[arg(long, default_value = "/opt/remote/var/client-swarm.log")]
    pub log_path: String,

    /// Seconds to wait for the swarm to come alive
    #[arg(long, default_value_t = 600)]
    pub start_timeout_secs: u64,

    /// Seconds to wait for the swarm to finish
    #[arg(long, default_value_t = 600)]
    pub wait_timeout_secs: u64,

    /// Seconds before a single remote command is abandoned
    #[arg(long, default_value_t = 60)]
    pub command_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the worker command line without contacting the host
    Render {
        #[command(flatten)]
        spec: SpecArgs,

        /// Print the full remote launch line instead
        #[arg(long)]
        launch: bool,
    },

    /// Clean the host, start the swarm and return once it is alive
    Start {
        #[command(flatten)]
        spec: SpecArgs,

        /// Skip killing leftovers and removing the old log
        #[arg(long)]
        no_clean: bool,
    },

    /// Report whether any worker is running on the host
    Status,

    /// Force-kill every worker on the host
    Kill,

    /// Clean, start, wait for completion, then stop
    Run {
        #[command(flatten)]
        spec: SpecArgs,

        /// Skip killing leftovers and removing the old log
        #[arg(long)]
        no_clean: bool,
    },
}

/// Worker spec, either from a JSON file or from flags.
#[derive(Args, Debug, Clone, Default)]
pub struct SpecArgs {
    /// JSON file describing the worker spec; the flags below are ignored
    #[arg(long, value_name = "FILE")]
    pub spec: Option<PathBuf>,

    /// Topic to produce to
    #[arg(long)]
    pub topic: Option<String>,

    /// Number of producers
    #[arg(long, default_value_t = 1)]
    pub producers: u32,

    /// Records per producer
    #[arg(long, default_value_t = 1000)]
    pub records: u64,

    /// Per-producer timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Client property as key=value, repeatable
    #[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Generate compressible payloads
    #[arg(long)]
    pub compressible_payload: bool,

    /// Compression codec
    #[arg(long)]
    pub compression_type: Option<String>,

    #[arg(long)]
    pub min_record_size: Option<u64>,

    #[arg(long)]
    pub max_record_size: Option<u64>,

    /// Key space size
    #[arg(long)]
    pub keys: Option<u64>,

    /// Rate limit per producer
    #[arg(long)]
    pub messages_per_second: Option<u64>,

    /// RUST_LOG value for the workers
    #[arg(long, default_value = "DEBUG")]
    pub worker_log_level: String,
}

impl SpecArgs {
    /// Build the (not yet validated) worker spec.
    pub fn to_worker_spec(&self) -> Result<WorkerSpec, Box<dyn Error>> {
        if let Some(path) = &self.spec {
            let raw = std::fs::read_to_string(path)?;
            return Ok(serde_json::from_str(&raw)?);
        }

        let topic = self
            .topic
            .clone()
            .ok_or("either --spec or --topic is required")?;

        let mut spec = WorkerSpec::new(topic, self.producers, self.records)
            .with_timeout_ms(self.timeout_ms)
            .with_compressible_payload(self.compressible_payload)
            .with_record_size(self.min_record_size, self.max_record_size)
            .with_log_level(self.worker_log_level.clone());
        for (key, value) in &self.properties {
            spec = spec.with_property(key, value);
        }
        if let Some(compression) = &self.compression_type {
            spec = spec.with_compression_type(compression);
        }
        if let Some(keys) = self.keys {
            spec = spec.with_keys(keys);
        }
        if let Some(rate) = self.messages_per_second {
            spec = spec.with_messages_per_second(rate);
        }
        Ok(spec)
    }
}

impl Cli {
    /// SSH coordinates, if `--host` was given.
    pub fn ssh_target(&self) -> Result<SshTarget, Box<dyn Error>> {
        let host = self.host.clone().ok_or("--host is required for this command")?;
        let mut target = SshTarget::new(host).with_port(self.port);
        if let Some(user) = &self.user {
            target = target.with_user(user);
        }
        if let Some(key) = &self.ssh_key {
            target = target.with_ssh_key(key);
        }
        Ok(target)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            exe: self.exe.clone(),
            log_path: self.log_path.clone(),
            control_dir: self.control_dir.clone(),
            start_timeout: Duration::from_secs(self.start_timeout_secs),
            wait_timeout: Duration::from_secs(self.wait_timeout_secs),
            ..SupervisorConfig::default()
        }
    }
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_property() {
        assert_eq!(
            parse_property("acks=all").unwrap(),
            ("acks".to_string(), "all".to_string())
        );
        assert_eq!(
            parse_property("sasl.jaas=a=b").unwrap(),
            ("sasl.jaas".to_string(), "a=b".to_string())
        );
        assert!(parse_property("novalue").is_err());
        assert!(parse_property("=x").is_err());
    }

    #[test]
    fn test_spec_from_flags() {
        let cli = Cli::try_parse_from([
            "loadswarm",
            "--brokers",
            "a:9092,b:9092",
            "render",
            "--topic",
            "t1",
            "--producers",
            "4",
            "--records",
            "1000",
            "--property",
            "acks=all",
            "--property",
            "linger.ms=5",
            "--keys",
            "16",
        ])
        .unwrap();
        assert_eq!(cli.brokers, vec!["a:9092".to_string(), "b:9092".to_string()]);

        let Commands::Render { spec, launch } = cli.command else {
            panic!("expected render");
        };
        assert!(!launch);
        let spec = spec.to_worker_spec().unwrap();
        assert_eq!(spec.topic, "t1");
        assert_eq!(spec.producers, 4);
        assert_eq!(spec.records_per_producer, 1000);
        assert_eq!(spec.keys, Some(16));
        assert_eq!(spec.properties.len(), 2);
        assert_eq!(spec.properties[1].0, "linger.ms");
        assert!(spec.compression_type.is_none());
    }

    #[test]
    fn test_spec_requires_topic_or_file() {
        let args = SpecArgs::default();
        let err = args.to_worker_spec().unwrap_err();
        assert!(err.to_string().contains("--topic"));
    }

    #[test]
    fn test_spec_from_file() {
        let path = std::env::temp_dir().join(format!("loadswarm-spec-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"topic": "from-file", "producers": 3, "records_per_producer": 9}"#,
        )
        .unwrap();

        let args = SpecArgs {
            spec: Some(path.clone()),
            topic: Some("ignored".to_string()),
            ..SpecArgs::default()
        };
        let spec = args.to_worker_spec().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(spec.topic, "from-file");
        assert_eq!(spec.producers, 3);
    }

    #[test]
    fn test_ssh_target_and_config() {
        let cli = Cli::try_parse_from([
            "loadswarm",
            "--host",
            "node-1",
            "--user",
            "ubuntu",
            "--port",
            "2222",
            "--start-timeout-secs",
            "30",
            "status",
        ])
        .unwrap();
        let target = cli.ssh_target().unwrap();
        assert_eq!(target.destination(), "ubuntu@node-1");
        assert_eq!(target.port, 2222);

        let config = cli.supervisor_config();
        assert_eq!(config.start_timeout, Duration::from_secs(30));
        assert_eq!(config.wait_timeout, Duration::from_secs(600));
        assert_eq!(config.wait_poll_interval, Duration::from_secs(5));
        assert_eq!(config.exe, "client-swarm");
        assert_eq!(cli.command_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_missing_host() {
        let cli = Cli::try_parse_from(["loadswarm", "kill"]).unwrap();
        assert!(cli.ssh_target().is_err());
    }
}
