//! Worker spec: everything one supervised run needs to know about its workers.

use serde::{Deserialize, Serialize};

use crate::CoreError;

fn default_timeout_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "DEBUG".to_string()
}

/// Configuration for one supervised swarm run.
///
/// Broker addresses are deliberately absent: they are re-resolved from the
/// target system every time the swarm is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Topic the producers write to.
    pub topic: String,

    /// Number of producer workers.
    pub producers: u32,

    /// Records each producer sends before exiting.
    pub records_per_producer: u64,

    /// Per-worker produce timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra client properties, passed through in order.
    #[serde(default)]
    pub properties: Vec<(String, String)>,

    /// Generate payloads that compress well.
    #[serde(default)]
    pub compressible_payload: bool,

    /// Client-side compression codec.
    #[serde(default)]
    pub compression_type: Option<String>,

    #[serde(default)]
    pub min_record_size: Option<u64>,

    #[serde(default)]
    pub max_record_size: Option<u64>,

    /// Size of the key space.
    #[serde(default)]
    pub keys: Option<u64>,

    /// Rate limit per producer.
    #[serde(default)]
    pub messages_per_second: Option<u64>,

    /// Value exported as `RUST_LOG` to the worker binary.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl WorkerSpec {
    /// Create a new WorkerSpec with the required fields.
    pub fn new(topic: impl Into<String>, producers: u32, records_per_producer: u64) -> Self {
        Self {
            topic: topic.into(),
            producers,
            records_per_producer,
            timeout_ms: default_timeout_ms(),
            properties: Vec::new(),
            compressible_payload: false,
            compression_type: None,
            min_record_size: None,
            max_record_size: None,
            keys: None,
            messages_per_second: None,
            log_level: default_log_level(),
        }
    }

    /// Builder method to set the per-worker timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Builder method to append a client property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Builder method to request compressible payloads.
    pub fn with_compressible_payload(mut self, compressible: bool) -> Self {
        self.compressible_payload = compressible;
        self
    }

    /// Builder method to set the compression codec.
    pub fn with_compression_type(mut self, compression: impl Into<String>) -> Self {
        self.compression_type = Some(compression.into());
        self
    }

    /// Builder method to bound record sizes. Either side may be left open.
    pub fn with_record_size(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_record_size = min;
        self.max_record_size = max;
        self
    }

    /// Builder method to set the key space.
    pub fn with_keys(mut self, keys: u64) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Builder method to rate limit each producer.
    pub fn with_messages_per_second(mut self, rate: u64) -> Self {
        self.messages_per_second = Some(rate);
        self
    }

    /// Builder method to set the worker log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Reject unusable settings and hand back a [`ValidatedSpec`].
    pub fn validate(self) -> Result<ValidatedSpec, CoreError> {
        if self.topic.trim().is_empty() {
            return Err(CoreError::InvalidConfig("topic must not be empty".to_string()));
        }
        if self.producers < 1 {
            return Err(CoreError::InvalidConfig(
                "producer count must be at least 1".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (self.min_record_size, self.max_record_size) {
            if min > max {
                return Err(CoreError::InvalidConfig(format!(
                    "min_record_size ({}) exceeds max_record_size ({})",
                    min, max
                )));
            }
        }
        if self.log_level.is_empty() || !self.log_level.chars().all(is_log_level_char) {
            return Err(CoreError::InvalidConfig(format!(
                "invalid log level '{}'",
                self.log_level
            )));
        }
        Ok(ValidatedSpec(self))
    }
}

/// `RUST_LOG` directives: levels, targets and `target=level` lists.
fn is_log_level_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ',' | '=' | ':' | '.' | '-')
}

/// A [`WorkerSpec`] that passed [`WorkerSpec::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedSpec(WorkerSpec);

impl ValidatedSpec {
    /// Borrow the underlying spec.
    pub fn spec(&self) -> &WorkerSpec {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec = WorkerSpec::new("t1", 4, 1000);
        assert_eq!(spec.timeout_ms, 1000);
        assert_eq!(spec.log_level, "DEBUG");
        assert!(spec.properties.is_empty());
        assert!(!spec.compressible_payload);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_zero_producers_rejected() {
        let err = WorkerSpec::new("t1", 0, 1000).validate().unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_topic_rejected() {
        let err = WorkerSpec::new("  ", 1, 10).validate().unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_inverted_record_sizes_rejected() {
        let err = WorkerSpec::new("t1", 1, 10)
            .with_record_size(Some(4096), Some(1024))
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidConfig(
                "min_record_size (4096) exceeds max_record_size (1024)".to_string()
            )
        );
    }

    #[test]
    fn test_half_open_or_equal_record_sizes_accepted() {
        assert!(WorkerSpec::new("t1", 1, 10)
            .with_record_size(Some(4096), None)
            .validate()
            .is_ok());
        assert!(WorkerSpec::new("t1", 1, 10)
            .with_record_size(None, Some(16))
            .validate()
            .is_ok());
        assert!(WorkerSpec::new("t1", 1, 10)
            .with_record_size(Some(512), Some(512))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_log_level_with_spaces_rejected() {
        let err = WorkerSpec::new("t1", 1, 10)
            .with_log_level("debug; rm -rf /")
            .validate()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_log_level_shell_metacharacters_rejected() {
        for level in ["info;id", "info;touch${IFS}/tmp/x;", "debug|id", "$(id)", "`id`", "a'b", "a\"b"] {
            let err = WorkerSpec::new("t1", 1, 10)
                .with_log_level(level)
                .validate()
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidConfig(ref m) if m.contains("log level")), "{}", level);
        }
    }

    #[test]
    fn test_log_level_directives_accepted() {
        for level in ["DEBUG", "info", "client_swarm=trace,rdkafka=warn", "a::b=debug", "x.y-z=info"] {
            assert!(WorkerSpec::new("t1", 1, 10).with_log_level(level).validate().is_ok(), "{}", level);
        }
    }

    #[test]
    fn test_deserialize_minimal_json() {
        let json = r#"{"topic": "t1", "producers": 2, "records_per_producer": 50}"#;
        let spec: WorkerSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec, WorkerSpec::new("t1", 2, 50));
    }

    #[test]
    fn test_deserialize_full_json() {
        let json = r#"{
            "topic": "t1",
            "producers": 2,
            "records_per_producer": 50,
            "timeout_ms": 30000,
            "properties": [["linger.ms", "5"], ["acks", "all"]],
            "compression_type": "zstd",
            "keys": 100,
            "log_level": "INFO"
        }"#;
        let spec: WorkerSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.timeout_ms, 30000);
        assert_eq!(spec.properties[0], ("linger.ms".to_string(), "5".to_string()));
        assert_eq!(spec.properties[1].0, "acks");
        assert_eq!(spec.compression_type.as_deref(), Some("zstd"));
        assert_eq!(spec.keys, Some(100));
        assert_eq!(spec.log_level, "INFO");
    }
}
