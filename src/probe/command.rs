//! Platform-specific ping invocations
//!
//! Translates a [`ProbeRequest`] into the argument vector understood by the
//! host operating system's ping utility. Pure: nothing is launched here.

use crate::probe::{ProbeCount, ProbeError, ProbeRequest};
use serde::{Deserialize, Serialize};

/// Name of the system ping utility
pub const PING_PROGRAM: &str = "ping";

/// Ping utility dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// iputils ping: `-c`, `-s`, `-W <seconds>`
    Linux,
    /// BSD-derived ping (macOS, FreeBSD): `-c`, `-s`, `-W <milliseconds>`
    Bsd,
    /// Windows ping: `-n`/`-t`, `-l`, `-w <milliseconds>`
    Windows,
}

impl Platform {
    /// The dialect of the platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(any(
            target_os = "macos",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        )) {
            Platform::Bsd
        } else {
            Platform::Linux
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::Bsd => write!(f, "bsd"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

/// A concrete process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCommand {
    /// Program to execute
    pub program: String,
    /// Arguments, target last
    pub args: Vec<String>,
}

impl ProbeCommand {
    /// Full argument vector including the program name
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl std::fmt::Display for ProbeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Build the ping invocation for `request` in the given dialect
///
/// # Errors
///
/// * `ProbeError::InvalidArgument` - zero count, packet size or timeout
pub fn build_command(request: &ProbeRequest, platform: Platform) -> Result<ProbeCommand, ProbeError> {
    request.validate()?;

    let mut args: Vec<String> = Vec::with_capacity(8);
    let timeout_ms = request.timeout.as_millis().max(1);

    match platform {
        Platform::Windows => {
            match request.count {
                ProbeCount::Continuous => args.push("-t".to_string()),
                ProbeCount::Fixed(n) => {
                    args.push("-n".to_string());
                    args.push(n.to_string());
                }
            }
            args.push("-l".to_string());
            args.push(request.packet_size.to_string());
            args.push("-w".to_string());
            args.push(timeout_ms.to_string());
        }
        Platform::Linux | Platform::Bsd => {
            if let ProbeCount::Fixed(n) = request.count {
                args.push("-c".to_string());
                args.push(n.to_string());
            }
            args.push("-s".to_string());
            args.push(request.packet_size.to_string());
            args.push("-W".to_string());
            if platform == Platform::Linux {
                // iputils takes whole seconds
                args.push(timeout_ms.div_ceil(1000).to_string());
            } else {
                args.push(timeout_ms.to_string());
            }
        }
    }

    args.push(request.target.clone());

    Ok(ProbeCommand {
        program: PING_PROGRAM.to_string(),
        args,
    })
}
