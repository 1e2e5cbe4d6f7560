//! Result types for sweeps

use crate::probe::{Classification, ProbeOutcome};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

/// Per-host entry of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSummary {
    /// Target as given
    pub target: String,
    /// Summary status
    pub classification: Classification,
    /// Echo requests considered sent
    pub sent: u32,
    /// Replies received
    pub received: u32,
    /// Mean reply time, when any reply arrived
    pub avg_ms: Option<f64>,
    /// Failure description, if any
    pub error: Option<String>,
}

impl HostSummary {
    /// Summarize a finished probe
    pub fn from_outcome(outcome: &ProbeOutcome) -> Self {
        let latencies = outcome.latencies();
        let avg_ms = if latencies.is_empty() {
            None
        } else {
            Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
        };

        Self {
            target: outcome.target.clone(),
            classification: outcome.classification,
            sent: outcome.sent,
            received: outcome.received(),
            avg_ms,
            error: outcome.error.clone(),
        }
    }

    /// An entry for a host whose probe could not produce an outcome
    pub fn failed(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            classification: Classification::Error,
            sent: 0,
            received: 0,
            avg_ms: None,
            error: Some(error.into()),
        }
    }

    /// Whether the host answered
    pub fn is_up(&self) -> bool {
        self.classification == Classification::Up
    }
}

/// Collected results of a sweep, keyed by target
///
/// Inserting a target twice keeps the last entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResult {
    entries: HashMap<String, HostSummary>,
    /// Whether the sweep was cancelled before every host finished
    pub cancelled: bool,
    /// Wall-clock duration of the sweep
    pub elapsed: Duration,
}

impl SweepResult {
    /// An empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a result from collected entries
    pub fn from_entries(entries: HashMap<String, HostSummary>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Add or replace the entry for `summary.target`
    pub fn insert(&mut self, summary: HostSummary) {
        self.entries.insert(summary.target.clone(), summary);
    }

    /// Number of hosts with an entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no host has an entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for one target
    pub fn get(&self, target: &str) -> Option<&HostSummary> {
        self.entries.get(target)
    }

    /// Entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &HostSummary> {
        self.entries.values()
    }

    /// Entries ordered by address (hostnames after addresses)
    pub fn sorted(&self) -> Vec<&HostSummary> {
        let mut entries: Vec<&HostSummary> = self.entries.values().collect();
        entries.sort_by(|a, b| host_order(&a.target, &b.target));
        entries
    }

    /// Responding hosts ordered by address
    pub fn up_hosts(&self) -> Vec<&HostSummary> {
        self.sorted().into_iter().filter(|h| h.is_up()).collect()
    }

    /// Number of entries with the given classification
    pub fn count(&self, classification: Classification) -> usize {
        self.entries
            .values()
            .filter(|h| h.classification == classification)
            .count()
    }
}

/// Order addresses numerically, then hostnames lexically
fn host_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up(target: &str, avg: f64) -> HostSummary {
        HostSummary {
            target: target.to_string(),
            classification: Classification::Up,
            sent: 1,
            received: 1,
            avg_ms: Some(avg),
            error: None,
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut result = SweepResult::new();
        result.insert(HostSummary::failed("10.0.0.1", "boom"));
        result.insert(up("10.0.0.1", 1.5));

        assert_eq!(result.len(), 1);
        assert!(result.get("10.0.0.1").unwrap().is_up());
    }

    #[test]
    fn test_sorted_by_address() {
        let mut result = SweepResult::new();
        result.insert(up("10.0.0.10", 1.0));
        result.insert(up("example.com", 1.0));
        result.insert(up("10.0.0.2", 1.0));
        result.insert(HostSummary::failed("10.0.0.1", "down"));

        let order: Vec<&str> = result.sorted().iter().map(|h| h.target.as_str()).collect();
        assert_eq!(order, vec!["10.0.0.1", "10.0.0.2", "10.0.0.10", "example.com"]);

        let up: Vec<&str> = result.up_hosts().iter().map(|h| h.target.as_str()).collect();
        assert_eq!(up, vec!["10.0.0.2", "10.0.0.10", "example.com"]);

        assert_eq!(result.count(Classification::Up), 3);
        assert_eq!(result.count(Classification::Error), 1);
    }

    #[test]
    fn test_failed_summary() {
        let summary = HostSummary::failed("10.0.0.1", "probe task failed");
        assert_eq!(summary.classification, Classification::Error);
        assert!(summary.avg_ms.is_none());
        assert!(!summary.is_up());
    }
}
