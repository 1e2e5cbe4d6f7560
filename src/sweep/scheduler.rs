//! Bounded worker pool that probes many hosts at once

use crate::probe::{ProbeError, ProbeRequest, Prober};
use crate::sweep::{HostSummary, SweepConfig, SweepResult};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Extra time granted past a host's deadline before its task is abandoned
const TASK_SLACK: Duration = Duration::from_secs(1);

/// Shared state of one sweep
struct SweepState {
    pending: Mutex<VecDeque<String>>,
    results: Mutex<HashMap<String, HostSummary>>,
}

impl SweepState {
    fn next_target(&self) -> Option<String> {
        self.pending.lock().expect("pending queue poisoned").pop_front()
    }

    fn record(&self, summary: HostSummary) {
        self.results
            .lock()
            .expect("results map poisoned")
            .insert(summary.target.clone(), summary);
    }
}

/// Probes a set of hosts with a fixed number of concurrent workers
///
/// # Examples
///
/// ```no_run
/// use pingsweep::{expand, SweepConfig, Sweeper};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hosts = expand("192.168.1.0/28");
/// let result = Sweeper::new().sweep(&hosts, &SweepConfig::default()).await?;
///
/// for host in result.up_hosts() {
///     println!("{} is up", host.target);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Sweeper {
    prober: Prober,
}

impl Sweeper {
    /// Create a sweeper that runs the system ping utility
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sweeper around an existing prober
    pub fn with_prober(prober: Prober) -> Self {
        Self { prober }
    }

    /// Probe every target and wait for all of them
    ///
    /// # Errors
    ///
    /// * `ProbeError::InvalidArgument` - the configuration is invalid
    ///
    /// Per-host failures become Error entries and never fail the sweep.
    pub async fn sweep(
        &self,
        targets: &[String],
        config: &SweepConfig,
    ) -> Result<SweepResult, ProbeError> {
        self.sweep_with(targets, config, None, &CancellationToken::new())
            .await
    }

    /// Probe every target with progress reporting and cancellation
    ///
    /// Each finished host is sent on `progress` in completion order. When
    /// `cancel` fires, in-flight probes are stopped with their partial
    /// results and targets that never started are recorded as errors, so
    /// the result still holds one entry per distinct target.
    ///
    /// # Errors
    ///
    /// * `ProbeError::InvalidArgument` - the configuration is invalid
    pub async fn sweep_with(
        &self,
        targets: &[String],
        config: &SweepConfig,
        progress: Option<mpsc::Sender<HostSummary>>,
        cancel: &CancellationToken,
    ) -> Result<SweepResult, ProbeError> {
        config.validate()?;
        let start = Instant::now();

        let mut seen = HashSet::new();
        let queue: VecDeque<String> = targets
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect();
        let order: Vec<String> = queue.iter().cloned().collect();

        if queue.is_empty() {
            return Ok(SweepResult::new());
        }

        let workers = config.concurrency.min(queue.len());
        info!(hosts = queue.len(), workers, "starting sweep");

        let state = Arc::new(SweepState {
            pending: Mutex::new(queue),
            results: Mutex::new(HashMap::with_capacity(order.len())),
        });

        let mut pool = JoinSet::new();
        for id in 0..workers {
            let worker = Worker {
                id,
                prober: self.prober.clone(),
                config: config.clone(),
                state: Arc::clone(&state),
                progress: progress.clone(),
                cancel: cancel.clone(),
            };
            pool.spawn(worker.run());
        }
        drop(progress);

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "sweep worker stopped unexpectedly");
            }
        }

        let mut entries = match Arc::try_unwrap(state) {
            Ok(state) => state.results.into_inner().expect("results map poisoned"),
            Err(state) => state.results.lock().expect("results map poisoned").clone(),
        };

        let reason = if cancel.is_cancelled() {
            "cancelled before probing"
        } else {
            "not probed"
        };
        for target in &order {
            entries
                .entry(target.clone())
                .or_insert_with(|| HostSummary::failed(target.clone(), reason));
        }

        let mut result = SweepResult::from_entries(entries);
        result.cancelled = cancel.is_cancelled();
        result.elapsed = start.elapsed();

        info!(
            hosts = result.len(),
            up = result.up_hosts().len(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            cancelled = result.cancelled,
            "sweep finished"
        );
        Ok(result)
    }
}

/// One member of the pool
struct Worker {
    id: usize,
    prober: Prober,
    config: SweepConfig,
    state: Arc<SweepState>,
    progress: Option<mpsc::Sender<HostSummary>>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        loop {
            if self.cancel.is_cancelled() {
                debug!(worker = self.id, "worker stopping on cancellation");
                break;
            }
            let Some(target) = self.state.next_target() else {
                break;
            };

            let summary = self.probe_host(target).await;
            self.state.record(summary.clone());

            if let Some(tx) = &self.progress {
                // A dropped receiver only means nobody is watching; a full
                // one must not outlive cancellation
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        debug!(worker = self.id, "progress report dropped on cancellation");
                    }
                    _ = tx.send(summary) => {}
                }
            }
        }
    }

    /// Probe one host in its own task so that a panic or hang stays contained
    async fn probe_host(&self, target: String) -> HostSummary {
        let request = match ProbeRequest::builder()
            .target(target.clone())
            .count(self.config.count)
            .packet_size(self.config.packet_size)
            .timeout(self.config.per_host_timeout)
            .deadline(self.config.host_deadline())
            .build()
        {
            Ok(request) => request,
            Err(e) => return HostSummary::failed(target, e.to_string()),
        };

        let prober = self.prober.clone();
        let token = self.cancel.child_token();
        let mut handle =
            tokio::spawn(async move { prober.probe(&request, None, &token).await });

        let bound = self.config.host_deadline() + TASK_SLACK;
        match tokio::time::timeout(bound, &mut handle).await {
            Ok(Ok(Ok(outcome))) => {
                debug!(
                    worker = self.id,
                    host = %target,
                    status = %outcome.classification,
                    "host finished"
                );
                HostSummary::from_outcome(&outcome)
            }
            Ok(Ok(Err(e))) => HostSummary::failed(target, e.to_string()),
            Ok(Err(e)) => {
                warn!(host = %target, error = %e, "probe task failed");
                HostSummary::failed(target, format!("probe task failed: {e}"))
            }
            Err(_) => {
                handle.abort();
                warn!(host = %target, "probe task exceeded its deadline");
                HostSummary::failed(target, ProbeError::Timeout.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Classification, Platform, Script, ScriptedRunner};

    fn sweeper(runner: ScriptedRunner) -> Sweeper {
        Sweeper::with_prober(Prober::with_runner(Arc::new(runner)).with_platform(Platform::Linux))
    }

    fn reply(host: &str) -> Script {
        Script::new()
            .line(format!("64 bytes from {host}: icmp_seq=1 ttl=64 time=1.5 ms"))
            .exit_code(0)
    }

    #[tokio::test]
    async fn test_empty_targets() {
        let result = sweeper(ScriptedRunner::new())
            .sweep(&[], &SweepConfig::default())
            .await
            .unwrap();
        assert!(result.is_empty());
        assert!(!result.cancelled);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = SweepConfig {
            concurrency: 0,
            ..SweepConfig::default()
        };
        let err = sweeper(ScriptedRunner::new())
            .sweep(&["10.0.0.1".to_string()], &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_duplicates_probed_once() {
        let runner = Arc::new(ScriptedRunner::new().with_default(reply("10.0.0.1")));
        let sweeper = Sweeper::with_prober(
            Prober::with_runner(runner.clone()).with_platform(Platform::Linux),
        );
        let targets = vec!["10.0.0.1".to_string(), "10.0.0.1".to_string()];

        let result = sweeper.sweep(&targets, &SweepConfig::default()).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(runner.launched().len(), 1);
        assert_eq!(
            result.get("10.0.0.1").unwrap().classification,
            Classification::Up
        );
    }

    #[tokio::test]
    async fn test_progress_reports_every_host() {
        let runner = ScriptedRunner::new()
            .with_script("10.0.0.1", reply("10.0.0.1"))
            .with_script("10.0.0.2", Script::launch_failure("no such file"));
        let targets = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        let (tx, mut rx) = mpsc::channel(8);

        let result = sweeper(runner)
            .sweep_with(
                &targets,
                &SweepConfig::default(),
                Some(tx),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let mut reported = Vec::new();
        while let Some(summary) = rx.recv().await {
            reported.push(summary.target);
        }
        reported.sort();
        assert_eq!(reported, targets);
        assert_eq!(result.count(Classification::Up), 1);
        assert_eq!(result.count(Classification::Error), 1);
    }

    #[tokio::test]
    async fn test_full_progress_channel_does_not_block_cancellation() {
        let runner = ScriptedRunner::new().with_default(reply("10.0.0.1"));
        let targets: Vec<String> = (1..=5).map(|i| format!("10.0.0.{i}")).collect();
        let config = SweepConfig::builder().concurrency(1).build().unwrap();

        // Held but never read
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            sweeper(runner).sweep_with(&targets, &config, Some(tx), &cancel),
        )
        .await
        .expect("sweep should return after cancellation")
        .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.len(), targets.len());
        assert!(result.count(Classification::Up) >= 1);
    }
}
