//! pingsweep - Ping latency statistics and concurrent host sweeps
//!
//! This library drives the system `ping` utility, parses its output into
//! latency samples, and reduces them into loss, latency and jitter figures.
//! Many hosts, or whole CIDR blocks, can be probed at once with a bounded
//! worker pool.
//!
//! # Example
//!
//! ```no_run
//! use pingsweep::{summarize, ProbeRequest, Prober};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = ProbeRequest::builder().target("example.com").count(5).build()?;
//! let outcome = Prober::new().probe_once(&request).await?;
//!
//! println!("{} is {}", outcome.target, outcome.classification);
//! if let Some(stats) = summarize(&outcome) {
//!     println!("jitter {:.2} ms", stats.jitter_ms);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod export;
pub mod history;
pub mod log;
pub mod probe;
pub mod stats;
pub mod sweep;

#[cfg(test)]
mod tests;

// Re-export core types for library users
pub use config::{AppConfig, ConfigError};
pub use export::{export, export_to_file, ExportFormat};
pub use history::{HistoryRecord, HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
pub use probe::{
    Classification, Platform, ProbeError, ProbeEvent, ProbeOutcome, ProbeRequest, Prober,
    ProcessRunner, Sample, Termination,
};
pub use stats::{summarize, Statistics, StatsRecord, ThresholdAlert, Thresholds};
pub use sweep::{expand, try_expand, HostSummary, SweepConfig, SweepResult, Sweeper};
