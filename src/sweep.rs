//! Concurrent reachability sweeps over many hosts

pub mod config;
pub mod result;
pub mod scheduler;
pub mod subnet;

pub use config::{SweepConfig, SweepConfigBuilder};
pub use result::{HostSummary, SweepResult};
pub use scheduler::Sweeper;
pub use subnet::{expand, try_expand, MAX_SWEEP_HOSTS};
