//! Round-trip statistics
//!
//! [`summarize`] reduces a finished [`ProbeOutcome`] into loss, latency and
//! jitter figures. Values are kept at full precision; rounding to two
//! decimals happens only when a [`StatsRecord`] is produced for display,
//! export or persistence.

use crate::probe::ProbeOutcome;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in persisted and exported records
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default packet-loss warning threshold in percent
pub const DEFAULT_LOSS_THRESHOLD_PCT: f64 = 5.0;
/// Default average-latency warning threshold in milliseconds
pub const DEFAULT_LATENCY_THRESHOLD_MS: f64 = 100.0;

/// Immutable statistics for one finished probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Target as requested
    pub target: String,
    /// When the underlying probe finished
    pub timestamp: DateTime<Local>,
    /// Echo requests considered sent
    pub sent: u32,
    /// Replies received
    pub received: u32,
    /// Packet loss in percent
    pub loss_pct: f64,
    /// Fastest reply
    pub min_ms: f64,
    /// Slowest reply
    pub max_ms: f64,
    /// Mean reply time
    pub avg_ms: f64,
    /// Mean absolute difference between consecutive replies
    pub jitter_ms: f64,
}

/// Compute statistics for a finished probe
///
/// Returns `None` when the probe produced no samples.
///
/// # Examples
///
/// ```
/// use pingsweep::stats::{jitter, loss_pct};
///
/// assert_eq!(jitter(&[10.0, 20.0, 15.0]), 7.5);
/// assert_eq!(loss_pct(5, 3), 40.0);
/// ```
pub fn summarize(outcome: &ProbeOutcome) -> Option<Statistics> {
    if outcome.samples.is_empty() {
        return None;
    }

    let latencies = outcome.latencies();
    let received = outcome.received();
    let sent = outcome.sent.max(received);

    let min_ms = latencies.iter().copied().fold(f64::INFINITY, f64::min);
    let max_ms = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = latencies.iter().sum::<f64>() / latencies.len() as f64;
    // Summation drift must not push the mean outside the observed range
    let avg_ms = mean.max(min_ms).min(max_ms);

    Some(Statistics {
        target: outcome.target.clone(),
        timestamp: outcome.finished_at,
        sent,
        received,
        loss_pct: loss_pct(sent, received),
        min_ms,
        max_ms,
        avg_ms,
        jitter_ms: jitter(&latencies),
    })
}

/// Packet loss in percent; 0 when nothing was sent
pub fn loss_pct(sent: u32, received: u32) -> f64 {
    if sent == 0 {
        return 0.0;
    }
    let lost = sent.saturating_sub(received);
    100.0 * f64::from(lost) / f64::from(sent)
}

/// Mean absolute difference between consecutive samples; 0 below two samples
pub fn jitter(latencies: &[f64]) -> f64 {
    if latencies.len() < 2 {
        return 0.0;
    }
    let total: f64 = latencies.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (latencies.len() - 1) as f64
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Statistics {
    /// The rounded record used for display, export and persistence
    pub fn to_record(&self) -> StatsRecord {
        StatsRecord {
            host: self.target.clone(),
            timestamp: self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            sent: self.sent,
            received: self.received,
            packet_loss_pct: round2(self.loss_pct),
            min_ms: round2(self.min_ms),
            max_ms: round2(self.max_ms),
            avg_ms: round2(self.avg_ms),
            jitter_ms: round2(self.jitter_ms),
        }
    }
}

/// Presentation form of [`Statistics`]
///
/// Field order is the column order of the delimited export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Target host
    pub host: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    /// Echo requests considered sent
    pub sent: u32,
    /// Replies received
    pub received: u32,
    /// Packet loss in percent
    pub packet_loss_pct: f64,
    /// Fastest reply
    pub min_ms: f64,
    /// Slowest reply
    pub max_ms: f64,
    /// Mean reply time
    pub avg_ms: f64,
    /// Jitter
    pub jitter_ms: f64,
}

/// Warning limits applied to finished statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Warn when loss exceeds this percentage
    pub loss_pct: f64,
    /// Warn when the average latency exceeds this many milliseconds
    pub avg_ms: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            loss_pct: DEFAULT_LOSS_THRESHOLD_PCT,
            avg_ms: DEFAULT_LATENCY_THRESHOLD_MS,
        }
    }
}

/// A threshold that was exceeded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdAlert {
    /// Loss above the limit, with the observed percentage
    HighLoss(f64),
    /// Average latency above the limit, with the observed value
    HighLatency(f64),
}

impl std::fmt::Display for ThresholdAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThresholdAlert::HighLoss(pct) => write!(f, "High packet loss detected ({pct:.1}%)"),
            ThresholdAlert::HighLatency(ms) => write!(f, "High latency detected ({ms:.2} ms)"),
        }
    }
}

impl Thresholds {
    /// Classify finished statistics; never alters them
    pub fn evaluate(&self, stats: &Statistics) -> Vec<ThresholdAlert> {
        let mut alerts = Vec::new();
        if stats.loss_pct > self.loss_pct {
            alerts.push(ThresholdAlert::HighLoss(stats.loss_pct));
        }
        if stats.avg_ms > self.avg_ms {
            alerts.push(ThresholdAlert::HighLatency(stats.avg_ms));
        }
        alerts
    }
}
