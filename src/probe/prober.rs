//! Single-host prober
//!
//! Runs one ping invocation, streams its output through the line parser and
//! finalizes a [`ProbeOutcome`] when the process exits, when the request's
//! deadline elapses, or when cancellation is requested. Partial results are
//! always kept.

use crate::probe::outcome::{classify, derive_sent};
use crate::probe::{
    build_command, parse_line, ParsedLine, Platform, ProbeError, ProbeEvent, ProbeOutcome,
    ProbeProcess, ProbeRequest, ProcessRunner, Sample, SystemRunner, Termination,
};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// How long to wait for the exit status once output has ended
const EXIT_WAIT: Duration = Duration::from_secs(1);

/// Runs ping against a single host
///
/// # Examples
///
/// ```no_run
/// use pingsweep::{summarize, ProbeRequest, Prober};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let request = ProbeRequest::builder().target("1.1.1.1").count(4).build()?;
/// let outcome = Prober::new().probe_once(&request).await?;
///
/// if let Some(stats) = summarize(&outcome) {
///     println!("avg {:.2} ms, loss {:.1}%", stats.avg_ms, stats.loss_pct);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Prober {
    runner: Arc<dyn ProcessRunner>,
    platform: Platform,
}

impl Prober {
    /// Create a prober that runs the system ping utility
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemRunner::new()))
    }

    /// Create a prober with a custom process runner
    ///
    /// Useful for testing or for substituting another reachability tool.
    pub fn with_runner(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            platform: Platform::current(),
        }
    }

    /// Override the ping dialect
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// The ping dialect used for invocations
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Run one probe to completion
    ///
    /// # Errors
    ///
    /// * `ProbeError::InvalidArgument` - the request is malformed; nothing is launched
    ///
    /// Launch failures and timeouts are reported through the outcome's
    /// classification, not as errors.
    pub async fn probe_once(&self, request: &ProbeRequest) -> Result<ProbeOutcome, ProbeError> {
        self.probe(request, None, &CancellationToken::new()).await
    }

    /// Run one probe with progress notifications and external cancellation
    ///
    /// One [`ProbeEvent`] is sent per non-empty output line. Cancelling
    /// `cancel` kills the process and finalizes the outcome with the samples
    /// collected so far; this is how continuous probes are stopped.
    ///
    /// # Errors
    ///
    /// * `ProbeError::InvalidArgument` - the request is malformed; nothing is launched
    pub async fn probe(
        &self,
        request: &ProbeRequest,
        events: Option<mpsc::Sender<ProbeEvent>>,
        cancel: &CancellationToken,
    ) -> Result<ProbeOutcome, ProbeError> {
        let command = build_command(request, self.platform)?;
        let started_at = Local::now();
        let host = request.target.as_str();

        if cancel.is_cancelled() {
            debug!(host, "cancelled before launch");
            return Ok(finalize(
                request,
                Vec::new(),
                Termination::Cancelled,
                None,
                Some("cancelled before launch".to_string()),
                started_at,
            ));
        }

        debug!(host, command = %command, "launching probe");
        let mut process = match self.runner.start(&command).await {
            Ok(process) => process,
            Err(e) => {
                warn!(host, error = %e, "probe launch failed");
                return Ok(ProbeOutcome::launch_failed(host, e.to_string(), started_at));
            }
        };

        let deadline = request.effective_deadline();
        let mut samples = Vec::new();
        let mut error = None;

        let termination = {
            let stream = stream_output(process.as_mut(), host, &mut samples, events.as_ref());
            let expiry = async {
                match deadline {
                    Some(d) => tokio::time::sleep(d).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Termination::Cancelled,
                result = stream => {
                    if let Err(e) = result {
                        error = Some(format!("failed to read probe output: {e}"));
                    }
                    Termination::Exited
                }
                _ = expiry => Termination::TimedOut,
            }
        };

        let exit_code = if termination == Termination::Exited && error.is_none() {
            match tokio::time::timeout(EXIT_WAIT, process.wait()).await {
                Ok(Ok(code)) => code,
                Ok(Err(e)) => {
                    debug!(host, error = %e, "could not collect exit status");
                    None
                }
                Err(_) => {
                    stop(process.as_mut(), host).await;
                    None
                }
            }
        } else {
            stop(process.as_mut(), host).await;
            None
        };

        match termination {
            Termination::TimedOut => {
                error.get_or_insert_with(|| {
                    format!(
                        "probe exceeded its deadline of {}ms",
                        deadline.map_or(0, |d| d.as_millis())
                    )
                });
            }
            Termination::Cancelled => {
                error.get_or_insert_with(|| "probe cancelled".to_string());
            }
            _ => {}
        }

        let outcome = finalize(request, samples, termination, exit_code, error, started_at);
        info!(
            host,
            sent = outcome.sent,
            received = outcome.received(),
            status = %outcome.classification,
            "probe finished"
        );
        Ok(outcome)
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Prober {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prober")
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

/// Read output until EOF, recording samples in reply order
async fn stream_output(
    process: &mut dyn ProbeProcess,
    host: &str,
    samples: &mut Vec<Sample>,
    events: Option<&mpsc::Sender<ProbeEvent>>,
) -> Result<(), ProbeError> {
    while let Some(line) = process.read_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed = parse_line(line);
        let sample = parsed.latency_ms().map(|latency_ms| {
            let sample = Sample {
                seq: u32::try_from(samples.len()).unwrap_or(u32::MAX),
                latency_ms,
            };
            samples.push(sample);
            sample
        });

        match parsed {
            ParsedLine::Sample(ms) => trace!(host, latency_ms = ms, "reply"),
            ParsedLine::Timeout => debug!(host, line, "no reply"),
            ParsedLine::Unreachable => debug!(host, line, "unreachable"),
            ParsedLine::Info | ParsedLine::Unparsed => trace!(host, line, "output"),
        }

        if let Some(tx) = events {
            // A dropped receiver only means nobody is watching
            let _ = tx
                .send(ProbeEvent {
                    target: host.to_string(),
                    line: line.to_string(),
                    parsed,
                    sample,
                })
                .await;
        }
    }
    Ok(())
}

async fn stop(process: &mut dyn ProbeProcess, host: &str) {
    if let Err(e) = process.kill().await {
        warn!(host, error = %e, "failed to kill probe process");
    }
}

fn finalize(
    request: &ProbeRequest,
    samples: Vec<Sample>,
    termination: Termination,
    exit_code: Option<i32>,
    error: Option<String>,
    started_at: chrono::DateTime<Local>,
) -> ProbeOutcome {
    let received = u32::try_from(samples.len()).unwrap_or(u32::MAX);
    let failed = error.is_some();
    ProbeOutcome {
        target: request.target.clone(),
        sent: derive_sent(request.count.fixed(), received),
        samples,
        classification: classify(received, termination, failed),
        termination,
        exit_code,
        error,
        started_at,
        finished_at: Local::now(),
    }
}
