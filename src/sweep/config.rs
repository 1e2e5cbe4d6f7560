//! Configuration for concurrent sweeps

use crate::probe::request::{DEADLINE_GRACE, DEFAULT_PACKET_SIZE};
use crate::probe::ProbeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of concurrent probes
pub const DEFAULT_CONCURRENCY: usize = 10;
/// Default per-reply wait during a sweep
pub const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_secs(1);
/// Default echo requests per host during a sweep
pub const DEFAULT_SWEEP_COUNT: u32 = 1;

/// Configuration for a sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Number of hosts probed at once (default: 10)
    pub concurrency: usize,
    /// Per-reply wait for each host (default: 1s)
    pub per_host_timeout: Duration,
    /// Echo requests per host (default: 1)
    pub count: u32,
    /// Payload size in bytes (default: 32)
    pub packet_size: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            per_host_timeout: DEFAULT_HOST_TIMEOUT,
            count: DEFAULT_SWEEP_COUNT,
            packet_size: DEFAULT_PACKET_SIZE,
        }
    }
}

impl SweepConfig {
    /// Create a new SweepConfig builder
    pub fn builder() -> SweepConfigBuilder {
        SweepConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.concurrency == 0 {
            return Err(ProbeError::invalid("concurrency must be at least 1"));
        }
        if self.per_host_timeout.is_zero() {
            return Err(ProbeError::invalid("per-host timeout must be greater than 0"));
        }
        if self.count == 0 {
            return Err(ProbeError::invalid("count must be greater than 0"));
        }
        if self.packet_size == 0 {
            return Err(ProbeError::invalid("packet size must be greater than 0"));
        }
        Ok(())
    }

    /// Wall-clock bound for one host: `count × per_host_timeout + 2s`
    pub fn host_deadline(&self) -> Duration {
        self.per_host_timeout.saturating_mul(self.count) + DEADLINE_GRACE
    }
}

/// Builder for SweepConfig
pub struct SweepConfigBuilder {
    config: SweepConfig,
}

impl SweepConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: SweepConfig::default(),
        }
    }

    /// Set the number of hosts probed at once
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set the per-reply wait for each host
    pub fn per_host_timeout(mut self, timeout: Duration) -> Self {
        self.config.per_host_timeout = timeout;
        self
    }

    /// Set the echo requests per host
    pub fn count(mut self, count: u32) -> Self {
        self.config.count = count;
        self
    }

    /// Set the payload size
    pub fn packet_size(mut self, size: u32) -> Self {
        self.config.packet_size = size;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SweepConfig, ProbeError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SweepConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SweepConfig::default();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.per_host_timeout, Duration::from_secs(1));
        assert_eq!(config.count, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(SweepConfig::builder().concurrency(0).build().is_err());
        assert!(SweepConfig::builder()
            .per_host_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(SweepConfig::builder().count(0).build().is_err());
        assert!(SweepConfig::builder().packet_size(0).build().is_err());
    }

    #[test]
    fn test_host_deadline() {
        let config = SweepConfig::builder()
            .per_host_timeout(Duration::from_millis(500))
            .count(2)
            .build()
            .unwrap();
        assert_eq!(config.host_deadline(), Duration::from_secs(3));
    }
}
