//! Error types for probe and sweep operations

use thiserror::Error;

/// Errors that can occur while probing hosts
///
/// Only malformed top-level input is surfaced as an `Err` from the probing
/// operations. Failures that belong to a single host (launch failures,
/// timeouts, unreadable output) are folded into that host's
/// [`ProbeOutcome`](crate::probe::ProbeOutcome) instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Malformed request, configuration or CIDR specification
    ///
    /// Reported before any process is launched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The ping utility could not be started
    #[error("Failed to launch probe process: {0}")]
    ProcessLaunch(String),

    /// The probe exceeded its wall-clock deadline
    #[error("Probe timed out")]
    Timeout,

    /// Reading from or signalling the probe process failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Saving or loading history failed
    ///
    /// Never invalidates statistics that were already computed.
    #[error("Failed to persist history: {0}")]
    Persistence(String),

    /// Serializing an export format failed
    #[error("Failed to export results: {0}")]
    Export(String),
}

impl ProbeError {
    /// Shorthand for building an [`ProbeError::InvalidArgument`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        ProbeError::InvalidArgument(msg.into())
    }
}
