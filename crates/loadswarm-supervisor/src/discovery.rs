//! Target-system address discovery.

use async_trait::async_trait;

use crate::error::DiscoveryError;

/// Source of the broker addresses of the system under test.
///
/// Queried on every start, never cached across instances.
#[async_trait]
pub trait BrokerDiscovery: Send + Sync {
    /// Current broker addresses, e.g. `10.0.0.1:9092`.
    async fn brokers(&self) -> Result<Vec<String>, DiscoveryError>;
}

/// A fixed broker list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticBrokers {
    addrs: Vec<String>,
}

impl StaticBrokers {
    pub fn new(addrs: Vec<String>) -> Self {
        Self { addrs }
    }
}

#[async_trait]
impl BrokerDiscovery for StaticBrokers {
    async fn brokers(&self) -> Result<Vec<String>, DiscoveryError> {
        Ok(self.addrs.clone())
    }
}
