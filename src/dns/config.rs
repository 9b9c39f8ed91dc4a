//! DNS resolver configuration.

use crate::base::neterror::NetError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`DnsResolver`](super::DnsResolver).
///
/// Loadable from JSON; durations are given in milliseconds:
///
/// ```json
/// { "min_time_between_resolutions_ms": 30000, "default_port": 443 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsResolverConfig {
    /// Minimum time between two lookups triggered by re-resolution requests
    #[serde(rename = "min_time_between_resolutions_ms", with = "millis")]
    pub min_time_between_resolutions: Duration,
    /// Fixed delay before retrying a failed lookup
    #[serde(rename = "retry_interval_ms", with = "millis")]
    pub retry_interval: Duration,
    /// Upper bound on a single lookup
    #[serde(rename = "lookup_timeout_ms", with = "millis")]
    pub lookup_timeout: Duration,
    /// Port used when the target does not name one
    pub default_port: u16,
}

impl Default for DnsResolverConfig {
    fn default() -> Self {
        Self {
            min_time_between_resolutions: Duration::from_secs(30),
            retry_interval: Duration::from_secs(1),
            lookup_timeout: Duration::from_secs(10),
            default_port: 443,
        }
    }
}

impl DnsResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, NetError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| NetError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NetError> {
        if self.retry_interval.is_zero() {
            return Err(NetError::InvalidConfig("retry_interval must be positive".into()));
        }
        if self.lookup_timeout.is_zero() {
            return Err(NetError::InvalidConfig("lookup_timeout must be positive".into()));
        }
        Ok(())
    }

    /// Set the minimum time between re-resolution lookups.
    pub fn min_time_between_resolutions(mut self, interval: Duration) -> Self {
        self.min_time_between_resolutions = interval;
        self
    }

    /// Set the retry delay after a failed lookup.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the lookup timeout.
    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Set the default port.
    pub fn default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
