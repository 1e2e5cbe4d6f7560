//! Line-by-line classification of ping output
//!
//! Every line the utility prints is either a latency sample, a known
//! failure marker, an informational header/footer, or something we do not
//! recognise. Unrecognised lines are never an error: ping implementations
//! print plenty of chatter.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lines longer than this are not inspected
pub const MAX_LINE_LEN: usize = 4096;

/// Latency token: a decimal number after a `time`-like label, before `ms`.
/// Windows prints `time<1ms` for sub-millisecond replies; the bound is taken
/// as the value.
static LATENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:time|süre|zeit|temps|tiempo|tempo)\s*[=<]?\s*(\d+(?:[.,]\d+)?)\s*ms")
        .expect("latency regex is valid")
});

/// Footer lines that carry a `time NNNNms` total which must not be read as
/// a sample.
const SUMMARY_MARKERS: &[&str] = &[
    "packets transmitted",
    "packets: sent",
    "paket: gönderilen",
    "round-trip",
    "rtt min",
    "ping statistics",
    "approximate round trip",
    "minimum =",
];

const TIMEOUT_MARKERS: &[&str] = &[
    "request timeout",
    "request timed out",
    "timed out",
    "no answer yet",
    "zaman aşımı",
];

const UNREACHABLE_MARKERS: &[&str] = &[
    "unreachable",
    "ulaşılamıyor",
    "could not find host",
    "unknown host",
    "name or service not known",
    "cannot resolve",
];

const INFO_PREFIXES: &[&str] = &["ping ", "pinging ", "--- ", "ping:"];

/// Classification of a single line of ping output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParsedLine {
    /// Round-trip latency in milliseconds
    Sample(f64),
    /// The utility reported a missing reply
    Timeout,
    /// The target or its network could not be reached or resolved
    Unreachable,
    /// Header, footer or summary output
    Info,
    /// Anything else
    Unparsed,
}

impl ParsedLine {
    /// The latency, if this line is a sample
    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            ParsedLine::Sample(ms) => Some(*ms),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParsedLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParsedLine::Sample(ms) => write!(f, "SAMPLE {ms} ms"),
            ParsedLine::Timeout => write!(f, "TIMEOUT"),
            ParsedLine::Unreachable => write!(f, "UNREACHABLE"),
            ParsedLine::Info => write!(f, "INFO"),
            ParsedLine::Unparsed => write!(f, "UNPARSED"),
        }
    }
}

/// Classify one line of ping output
///
/// # Examples
///
/// ```
/// use pingsweep::probe::{parse_line, ParsedLine};
///
/// let line = "64 bytes from 1.1.1.1: icmp_seq=1 ttl=56 time=14.2 ms";
/// assert_eq!(parse_line(line), ParsedLine::Sample(14.2));
/// assert_eq!(parse_line("Request timeout for icmp_seq 0"), ParsedLine::Timeout);
/// ```
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() || line.len() > MAX_LINE_LEN {
        return ParsedLine::Unparsed;
    }

    let lower = line.to_lowercase();

    if SUMMARY_MARKERS.iter().any(|m| lower.contains(m)) {
        return ParsedLine::Info;
    }
    if TIMEOUT_MARKERS.iter().any(|m| lower.contains(m)) {
        return ParsedLine::Timeout;
    }
    if UNREACHABLE_MARKERS.iter().any(|m| lower.contains(m)) {
        return ParsedLine::Unreachable;
    }
    if let Some(ms) = parse_latency(line) {
        return ParsedLine::Sample(ms);
    }
    if INFO_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return ParsedLine::Info;
    }

    ParsedLine::Unparsed
}

/// Extract the latency token from a line, if present
fn parse_latency(line: &str) -> Option<f64> {
    let caps = LATENCY_RE.captures(line)?;
    let raw = caps.get(1)?.as_str().replace(',', ".");
    raw.parse::<f64>()
        .ok()
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
}
