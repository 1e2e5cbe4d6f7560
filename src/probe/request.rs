//! Request types for single-host probes

use crate::probe::ProbeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of echo requests for a single-host probe
pub const DEFAULT_COUNT: u32 = 4;
/// Default payload size in bytes
pub const DEFAULT_PACKET_SIZE: u32 = 32;
/// Default per-reply wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
/// Assumed gap between echo requests of the system ping utility
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(1);
/// Slack added on top of the expected run time of a counted probe
pub const DEADLINE_GRACE: Duration = Duration::from_secs(2);

/// How many echo requests a probe sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeCount {
    /// A fixed number of echo requests
    Fixed(u32),
    /// Run until cancelled
    Continuous,
}

impl ProbeCount {
    /// The explicit count, if any
    pub fn fixed(&self) -> Option<u32> {
        match self {
            ProbeCount::Fixed(n) => Some(*n),
            ProbeCount::Continuous => None,
        }
    }

    /// Whether this is an open-ended probe
    pub fn is_continuous(&self) -> bool {
        matches!(self, ProbeCount::Continuous)
    }
}

/// A single-host probe request
///
/// Built per invocation and consumed once by
/// [`Prober::probe`](crate::probe::Prober::probe).
///
/// # Examples
///
/// ```
/// use pingsweep::ProbeRequest;
/// use std::time::Duration;
///
/// let request = ProbeRequest::builder()
///     .target("1.1.1.1")
///     .count(5)
///     .packet_size(64)
///     .timeout(Duration::from_secs(1))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.count.fixed(), Some(5));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRequest {
    /// Target hostname or IP address
    pub target: String,
    /// Number of echo requests, or continuous
    pub count: ProbeCount,
    /// Payload size in bytes (default: 32)
    pub packet_size: u32,
    /// How long the utility waits for each reply (default: 2s)
    pub timeout: Duration,
    /// Overall wall-clock bound for the whole probe
    ///
    /// When unset, counted probes get [`ProbeRequest::effective_deadline`]
    /// and continuous probes run until cancelled.
    pub deadline: Option<Duration>,
}

impl Default for ProbeRequest {
    fn default() -> Self {
        Self {
            target: String::new(),
            count: ProbeCount::Fixed(DEFAULT_COUNT),
            packet_size: DEFAULT_PACKET_SIZE,
            timeout: DEFAULT_TIMEOUT,
            deadline: None,
        }
    }
}

impl ProbeRequest {
    /// Create a new ProbeRequest builder
    pub fn builder() -> ProbeRequestBuilder {
        ProbeRequestBuilder::new()
    }

    /// Validate the request
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.target.trim().is_empty() {
            return Err(ProbeError::invalid("target must be specified"));
        }
        if self.target.starts_with('-') {
            return Err(ProbeError::invalid(format!(
                "target '{}' looks like a flag",
                self.target
            )));
        }
        if self.count == ProbeCount::Fixed(0) {
            return Err(ProbeError::invalid("count must be greater than 0"));
        }
        if self.packet_size == 0 {
            return Err(ProbeError::invalid("packet size must be greater than 0"));
        }
        if self.timeout.is_zero() {
            return Err(ProbeError::invalid("timeout must be greater than 0"));
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(ProbeError::invalid("deadline must be greater than 0"));
        }
        Ok(())
    }

    /// Overall wall-clock bound applied by the prober
    ///
    /// Counted probes default to `count × (timeout + 1s) + 2s`; continuous
    /// probes have no bound unless one was set explicitly.
    pub fn effective_deadline(&self) -> Option<Duration> {
        if self.deadline.is_some() {
            return self.deadline;
        }
        self.count.fixed().map(|n| {
            (self.timeout + DEFAULT_SEND_INTERVAL).saturating_mul(n) + DEADLINE_GRACE
        })
    }
}

/// Builder for ProbeRequest
pub struct ProbeRequestBuilder {
    request: ProbeRequest,
    count: Option<u32>,
    continuous: bool,
}

impl ProbeRequestBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            request: ProbeRequest::default(),
            count: None,
            continuous: false,
        }
    }

    /// Set the target hostname or IP address
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.request.target = target.into();
        self
    }

    /// Set an explicit number of echo requests
    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Run until cancelled instead of a fixed count
    pub fn continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    /// Set the payload size in bytes
    pub fn packet_size(mut self, size: u32) -> Self {
        self.request.packet_size = size;
        self
    }

    /// Set the per-reply wait
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = timeout;
        self
    }

    /// Set the overall wall-clock bound
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.request.deadline = Some(deadline);
        self
    }

    /// Build the request
    ///
    /// Fails with [`ProbeError::InvalidArgument`] when an explicit count is
    /// combined with `continuous(true)` or when any value is out of range.
    pub fn build(self) -> Result<ProbeRequest, ProbeError> {
        let mut request = self.request;
        request.count = match (self.count, self.continuous) {
            (Some(_), true) => {
                return Err(ProbeError::invalid(
                    "an explicit count cannot be combined with continuous mode",
                ))
            }
            (Some(n), false) => ProbeCount::Fixed(n),
            (None, true) => ProbeCount::Continuous,
            (None, false) => ProbeCount::Fixed(DEFAULT_COUNT),
        };
        request.validate()?;
        Ok(request)
    }
}

impl Default for ProbeRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
