//! Result types for single-host probes

use crate::probe::ParsedLine;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Assumed number of echo requests when a probe had no explicit count and
/// produced no samples.
///
/// This is an approximation: it understates loss whenever the utility's real
/// default differed from four requests. Callers that need accurate loss for
/// continuous probes should track what they asked for themselves.
pub const FALLBACK_SENT_COUNT: u32 = 4;

/// A single latency measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Zero-based position in the probe's reply sequence
    pub seq: u32,
    /// Round-trip time in milliseconds
    pub latency_ms: f64,
}

/// Summary status of a single-host probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// At least one reply was received
    Up,
    /// The utility ran to completion without a reply
    Down,
    /// The probe could not run or did not finish on its own
    Error,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Up => write!(f, "UP"),
            Classification::Down => write!(f, "DOWN"),
            Classification::Error => write!(f, "ERROR"),
        }
    }
}

/// How a probe run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The utility exited on its own
    Exited,
    /// The wall-clock deadline elapsed and the process was killed
    TimedOut,
    /// Cancellation was requested and the process was killed
    Cancelled,
    /// The process could not be started
    LaunchFailed,
}

/// The finalized result of one probe run
///
/// Samples are kept in reply order. `received()` is always the number of
/// samples and `sent` is never below it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Target as requested
    pub target: String,
    /// Number of echo requests considered sent
    pub sent: u32,
    /// Latency samples in reply order
    pub samples: Vec<Sample>,
    /// Summary status
    pub classification: Classification,
    /// How the run ended
    pub termination: Termination,
    /// Exit code of the utility, informational only
    pub exit_code: Option<i32>,
    /// Description of the failure, if any
    pub error: Option<String>,
    /// When the process was started
    pub started_at: DateTime<Local>,
    /// When the outcome was finalized
    pub finished_at: DateTime<Local>,
}

impl ProbeOutcome {
    /// Number of replies received
    pub fn received(&self) -> u32 {
        u32::try_from(self.samples.len()).unwrap_or(u32::MAX)
    }

    /// Whether the host answered at least once
    pub fn is_up(&self) -> bool {
        self.classification == Classification::Up
    }

    /// Latencies in reply order
    pub fn latencies(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.latency_ms).collect()
    }

    /// Outcome for a probe whose process could not be started
    pub(crate) fn launch_failed(target: &str, error: String, started_at: DateTime<Local>) -> Self {
        Self {
            target: target.to_string(),
            sent: 0,
            samples: Vec::new(),
            classification: Classification::Error,
            termination: Termination::LaunchFailed,
            exit_code: None,
            error: Some(error),
            started_at,
            finished_at: Local::now(),
        }
    }
}

/// Number of requests considered sent for a finished run
///
/// An explicit count is authoritative; otherwise the received count is used,
/// falling back to [`FALLBACK_SENT_COUNT`] when nothing came back.
pub fn derive_sent(explicit: Option<u32>, received: u32) -> u32 {
    match explicit {
        Some(n) => n.max(received),
        None if received > 0 => received,
        None => FALLBACK_SENT_COUNT,
    }
}

/// Final status for a run
pub fn classify(received: u32, termination: Termination, failed: bool) -> Classification {
    if received > 0 {
        return Classification::Up;
    }
    match termination {
        Termination::Exited if !failed => Classification::Down,
        _ => Classification::Error,
    }
}

/// Progress notification, one per line of output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeEvent {
    /// Target being probed
    pub target: String,
    /// Raw line, trimmed
    pub line: String,
    /// How the line was classified
    pub parsed: ParsedLine,
    /// The sample recorded for this line, if any
    pub sample: Option<Sample>,
}
