//! Single-host probing on top of the system ping utility

pub mod command;
pub mod error;
pub mod outcome;
pub mod parser;
pub mod prober;
pub mod request;
pub mod runner;

// Re-export commonly used types
pub use command::{build_command, Platform, ProbeCommand, PING_PROGRAM};
pub use error::ProbeError;
pub use outcome::{
    Classification, ProbeEvent, ProbeOutcome, Sample, Termination, FALLBACK_SENT_COUNT,
};
pub use parser::{parse_line, ParsedLine};
pub use prober::Prober;
pub use request::{ProbeCount, ProbeRequest, ProbeRequestBuilder};
pub use runner::{ProbeProcess, ProcessRunner, Script, ScriptStep, ScriptedRunner, SystemRunner};
