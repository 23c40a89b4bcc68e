//! Command-line assembly for the `client-swarm` worker binary.
//!
//! The argument order is part of the worker binary's contract: the transport
//! endpoints first, then the `producers` subcommand with its required flags,
//! then repeated `--properties`, then the optional flags in a fixed order.

use crate::ValidatedSpec;

/// Name of the load-generation binary on the remote host.
pub const DEFAULT_EXE: &str = "client-swarm";

/// A fully rendered invocation of the worker binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwarmCommand {
    exe: String,
    args: Vec<String>,
    log_level: String,
}

impl SwarmCommand {
    /// Build the invocation for `spec` against the given broker addresses.
    pub fn new(exe: impl Into<String>, brokers: &[String], spec: &ValidatedSpec) -> Self {
        let spec = spec.spec();
        let mut args = vec![
            "--brokers".to_string(),
            brokers.join(","),
            "producers".to_string(),
            "--topic".to_string(),
            spec.topic.clone(),
            "--count".to_string(),
            spec.producers.to_string(),
            "--messages".to_string(),
            spec.records_per_producer.to_string(),
            "--timeout-ms".to_string(),
            spec.timeout_ms.to_string(),
        ];

        for (key, value) in &spec.properties {
            args.push("--properties".to_string());
            args.push(format!("{}={}", key, value));
        }

        if spec.compressible_payload {
            args.push("--compressible-payload".to_string());
        }
        if let Some(compression) = &spec.compression_type {
            args.push(format!("--compression-type={}", compression));
        }
        if let Some(min) = spec.min_record_size {
            args.push(format!("--min-record-size={}", min));
        }
        if let Some(max) = spec.max_record_size {
            args.push(format!("--max-record-size={}", max));
        }
        if let Some(keys) = spec.keys {
            args.push(format!("--keys={}", keys));
        }
        if let Some(rate) = spec.messages_per_second {
            args.push("--messages-per-second".to_string());
            args.push(rate.to_string());
        }

        Self {
            exe: exe.into(),
            args,
            log_level: spec.log_level.clone(),
        }
    }

    /// The executable name.
    pub fn exe(&self) -> &str {
        &self.exe
    }

    /// The command line as the worker binary receives it.
    pub fn render(&self) -> String {
        let mut line = self.exe.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// The remote shell line that hands the command to the host's `start.sh`
    /// control script, which detaches it from the session.
    ///
    /// Every interpolated value reaches the shell as a single word.
    pub fn launch_line(&self, control_dir: &str) -> String {
        let script = format!("{}/start.sh", control_dir.trim_end_matches('/'));
        format!(
            "RUST_LOG={} bash {} {} \"{}\"",
            shell_word(&self.log_level),
            shell_word(&script),
            shell_word(&self.exe),
            escape_double_quoted(&self.render())
        )
    }
}

/// Leave `raw` bare when the shell would read it literally, else single-quote it.
fn shell_word(raw: &str) -> String {
    let is_plain = |c: char| {
        c.is_ascii_alphanumeric()
            || matches!(c, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
    };
    if !raw.is_empty() && raw.chars().all(is_plain) {
        raw.to_string()
    } else {
        format!("'{}'", raw.replace('\'', "'\\''"))
    }
}

/// Escape the characters a POSIX shell still interprets inside `"..."`.
fn escape_double_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
