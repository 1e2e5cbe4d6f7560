//! pingsweep - ping latency statistics and concurrent host sweeps.
//!
//! This is the command-line interface for the pingsweep library.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::needless_pass_by_value)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use pingsweep::config::default_config_path;
use pingsweep::probe::ParsedLine;
use pingsweep::sweep::config::DEFAULT_SWEEP_COUNT;
use pingsweep::{
    export_to_file, summarize, try_expand, AppConfig, Classification, ExportFormat, HistoryRecord,
    HistoryStore, HostSummary, JsonlHistoryStore, ProbeEvent, ProbeRequest, Prober, Statistics,
    SweepConfig, SweepResult, Sweeper,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Get the version string for pingsweep
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the ping tool.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Ping statistics and concurrent host sweeps", long_about = None)]
struct Args {
    /// Target hostname or IP address
    #[clap(required_unless_present_any = ["multi", "sweep", "history"])]
    host: Option<String>,

    /// Number of echo requests to send
    #[clap(short, long)]
    count: Option<u32>,

    /// Payload size in bytes
    #[clap(short, long)]
    size: Option<u32>,

    /// Seconds to wait for each reply
    #[clap(short, long)]
    timeout: Option<f64>,

    /// Ping until interrupted with Ctrl-C
    #[clap(short = 'C', long, conflicts_with_all = ["count", "multi", "sweep"])]
    continuous: bool,

    /// Write the run's statistics to this file
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Format used with --output
    #[clap(short, long, value_enum, default_value_t = FormatArg::Txt)]
    format: FormatArg,

    /// Probe several hosts concurrently
    #[clap(short, long, num_args = 1.., conflicts_with_all = ["host", "sweep"])]
    multi: Vec<String>,

    /// Sweep a CIDR block and list the hosts that answer
    #[clap(short = 'S', long, conflicts_with = "host")]
    sweep: Option<String>,

    /// Show the most recent saved runs
    #[clap(short = 'H', long)]
    history: bool,

    /// Concurrent probes for --multi and --sweep
    #[clap(long)]
    threads: Option<usize>,

    /// Configuration file (default: ~/.pingsweep/config.yaml)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Output results in JSON format
    #[clap(long)]
    json: bool,

    /// Enable verbose output (use -vv for debug logs)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum FormatArg {
    Json,
    Csv,
    Txt,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Txt => ExportFormat::Text,
        }
    }
}

/// JSON output structure for a single-host run
#[derive(Debug, serde::Serialize)]
struct JsonProbe {
    version: String,
    target: String,
    status: Classification,
    error: Option<String>,
    statistics: Option<pingsweep::StatsRecord>,
    alerts: Vec<String>,
}

/// JSON output structure for a multi-host run
#[derive(Debug, serde::Serialize)]
struct JsonSweep<'a> {
    version: String,
    hosts: Vec<&'a HostSummary>,
    up: usize,
    total: usize,
    cancelled: bool,
    elapsed_ms: u128,
}

fn main() {
    // Quick check for help/version before starting async runtime
    let args: Vec<String> = std::env::args().collect();
    if args.len() == 2 && (args[1] == "--version" || args[1] == "-V") {
        println!("pingsweep {}", get_version());
        return;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    match runtime.block_on(async_main()) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn async_main() -> Result<i32> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let level = pingsweep::log::level_for_verbosity(
        pingsweep::log::parse_level(&config.logging.level),
        args.verbose,
    );
    pingsweep::log::init_logger(level, config.logging.path.as_deref())?;

    if args.history {
        return show_history(&args, &config);
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    if let Some(cidr) = &args.sweep {
        return run_sweep(&args, &config, cidr, &cancel).await;
    }
    if !args.multi.is_empty() {
        return run_multi(&args, &config, &cancel).await;
    }

    let host = args
        .host
        .as_deref()
        .context("a target host is required")?;
    run_single(&args, &config, host, &cancel).await
}

/// Load the file named by --config, or the default file when present
fn load_config(args: &Args) -> Result<AppConfig> {
    let config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => match default_config_path() {
            Some(path) => AppConfig::load_or_default(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => AppConfig::default(),
        },
    };
    Ok(config)
}

/// Cancel `token` on the first Ctrl-C
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            token.cancel();
        }
    });
}

fn timeout_arg(secs: Option<f64>, default: Duration) -> Result<Duration> {
    match secs {
        None => Ok(default),
        Some(secs) if secs > 0.0 => {
            Duration::try_from_secs_f64(secs).context("timeout is out of range")
        }
        Some(secs) => bail!("timeout must be greater than 0 (got {})", secs),
    }
}

/// Build the single-host request from flags, falling back to the config file
fn build_probe_request(args: &Args, config: &AppConfig, host: &str) -> Result<ProbeRequest> {
    let mut builder = ProbeRequest::builder()
        .target(host)
        .packet_size(args.size.unwrap_or(config.ping.size))
        .timeout(timeout_arg(args.timeout, config.ping.timeout)?);

    builder = if args.continuous {
        builder.continuous(true)
    } else {
        builder.count(args.count.unwrap_or(config.ping.count))
    };

    Ok(builder.build()?)
}

/// Sweep settings for --multi or --sweep
///
/// Both send one request per host unless -c says otherwise. --multi waits
/// as long as a single-host ping, --sweep uses the shorter scanner timeout.
fn build_sweep_config(args: &Args, config: &AppConfig, quick: bool) -> Result<SweepConfig> {
    let timeout = if quick {
        config.scanner.timeout
    } else {
        config.ping.timeout
    };

    Ok(SweepConfig::builder()
        .concurrency(args.threads.unwrap_or(config.scanner.threads))
        .count(args.count.unwrap_or(DEFAULT_SWEEP_COUNT))
        .packet_size(args.size.unwrap_or(config.ping.size))
        .per_host_timeout(timeout_arg(args.timeout, timeout)?)
        .build()?)
}

async fn run_single(
    args: &Args,
    config: &AppConfig,
    host: &str,
    cancel: &CancellationToken,
) -> Result<i32> {
    let request = build_probe_request(args, config, host)?;
    let prober = Prober::new();

    if !args.json {
        println!(
            "PING {} ({} bytes) via {} ping{}",
            host,
            request.packet_size,
            prober.platform(),
            if request.count.is_continuous() {
                ", Ctrl-C to stop"
            } else {
                ""
            }
        );
    }

    let (tx, mut rx) = mpsc::channel::<ProbeEvent>(64);
    let quiet = args.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if quiet {
                continue;
            }
            if let Some(line) = format_event(&event) {
                println!("{}", line);
            }
        }
    });

    let outcome = prober.probe(&request, Some(tx), cancel).await?;
    let _ = printer.await;

    let stats = summarize(&outcome);
    let alerts = stats
        .as_ref()
        .map(|s| config.thresholds.evaluate(s))
        .unwrap_or_default();

    if let Some(stats) = &stats {
        if config.history.enabled {
            save_history(config, stats);
        }
        if let Some(path) = &args.output {
            export_to_file(path, stats, args.format.into())?;
            if !args.json {
                println!("Results exported to {}", path.display());
            }
        }
    }

    if args.json {
        let output = JsonProbe {
            version: get_version().to_string(),
            target: outcome.target.clone(),
            status: outcome.classification,
            error: outcome.error.clone(),
            statistics: stats.as_ref().map(Statistics::to_record),
            alerts: alerts.iter().map(ToString::to_string).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        match &stats {
            Some(stats) => print!("{}", format_statistics(stats)),
            None => println!(
                "{} is {}{}",
                outcome.target,
                outcome.classification,
                outcome
                    .error
                    .as_ref()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            ),
        }
        for alert in &alerts {
            eprintln!("Warning: {}", alert);
        }
    }

    Ok(if outcome.is_up() { 0 } else { 1 })
}

/// Persist statistics; failures are reported but never abort the run
fn save_history(config: &AppConfig, stats: &Statistics) {
    let Some(path) = config.history_path() else {
        tracing::warn!("no home directory, history not saved");
        return;
    };
    if let Err(e) = JsonlHistoryStore::new(path).save(stats) {
        tracing::warn!(error = %e, "history not saved");
        eprintln!("Warning: {}", e);
    }
}

fn show_history(args: &Args, config: &AppConfig) -> Result<i32> {
    let path = config
        .history_path()
        .context("no home directory for the history file")?;
    let records = JsonlHistoryStore::new(path).query(config.history.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{}", format_history(&records));
    }
    Ok(0)
}

async fn run_multi(args: &Args, config: &AppConfig, cancel: &CancellationToken) -> Result<i32> {
    let sweep_config = build_sweep_config(args, config, false)?;
    let result = Sweeper::new()
        .sweep_with(&args.multi, &sweep_config, None, cancel)
        .await?;

    if args.json {
        print_sweep_json(&result, result.sorted())?;
    } else {
        print!("{}", format_host_table(&result.sorted()));
        println!("{}", format_sweep_footer(&result));
    }
    Ok(0)
}

async fn run_sweep(
    args: &Args,
    config: &AppConfig,
    cidr: &str,
    cancel: &CancellationToken,
) -> Result<i32> {
    let hosts: Vec<String> = try_expand(cidr)?
        .iter()
        .map(ToString::to_string)
        .collect();
    if hosts.is_empty() {
        bail!("{} contains no usable host addresses", cidr);
    }
    let sweep_config = build_sweep_config(args, config, true)?;

    if !args.json {
        println!(
            "Sweeping {} ({} hosts, {} at a time)",
            cidr,
            hosts.len(),
            sweep_config.concurrency
        );
    }

    // Report responders as they finish
    let (tx, mut rx) = mpsc::channel::<HostSummary>(64);
    let quiet = args.json;
    let printer = tokio::spawn(async move {
        while let Some(summary) = rx.recv().await {
            if !quiet && summary.is_up() {
                println!("{}", format_host_line(&summary));
            }
        }
    });

    let result = Sweeper::new()
        .sweep_with(&hosts, &sweep_config, Some(tx), cancel)
        .await?;
    let _ = printer.await;

    if args.json {
        print_sweep_json(&result, result.up_hosts())?;
    } else {
        println!("{}", format_sweep_footer(&result));
    }
    Ok(0)
}

fn print_sweep_json(result: &SweepResult, hosts: Vec<&HostSummary>) -> Result<()> {
    let output = JsonSweep {
        version: get_version().to_string(),
        hosts,
        up: result.count(Classification::Up),
        total: result.len(),
        cancelled: result.cancelled,
        elapsed_ms: result.elapsed.as_millis(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One console line per interesting output line
fn format_event(event: &ProbeEvent) -> Option<String> {
    match event.parsed {
        ParsedLine::Sample(ms) => Some(format!(
            "Reply from {}: seq={} time={:.2} ms",
            event.target,
            event.sample.map(|s| s.seq).unwrap_or_default(),
            ms
        )),
        ParsedLine::Timeout => Some("Request timed out".to_string()),
        ParsedLine::Unreachable => Some(event.line.trim().to_string()),
        ParsedLine::Info | ParsedLine::Unparsed => None,
    }
}

fn format_statistics(stats: &Statistics) -> String {
    let record = stats.to_record();
    format!(
        "--- {} statistics ---\n\
         {} packets transmitted, {} received, {}% packet loss\n\
         rtt min/avg/max = {:.2}/{:.2}/{:.2} ms, jitter {:.2} ms\n",
        record.host,
        record.sent,
        record.received,
        record.packet_loss_pct,
        record.min_ms,
        record.avg_ms,
        record.max_ms,
        record.jitter_ms
    )
}

fn format_history(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "No history recorded yet\n".to_string();
    }
    let mut out = format!(
        "{:<19}  {:<24} {:>7} {:>9} {:>9}\n",
        "TIME", "HOST", "LOSS%", "AVG ms", "JITTER"
    );
    for r in records {
        out.push_str(&format!(
            "{:<19}  {:<24} {:>7.1} {:>9.2} {:>9.2}\n",
            r.timestamp, r.host, r.packet_loss_pct, r.avg_ms, r.jitter_ms
        ));
    }
    out
}

fn format_host_line(summary: &HostSummary) -> String {
    let latency = summary
        .avg_ms
        .map(|ms| format!("{:.2} ms", ms))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<40} {:<6} {:>3}/{:<3} {:>10}",
        summary.target, summary.classification, summary.received, summary.sent, latency
    )
}

fn format_host_table(hosts: &[&HostSummary]) -> String {
    let mut out = format!(
        "{:<40} {:<6} {:>7} {:>10}\n",
        "HOST", "STATUS", "RECV", "AVG"
    );
    for host in hosts {
        out.push_str(&format_host_line(host));
        out.push('\n');
    }
    out
}

fn format_sweep_footer(result: &SweepResult) -> String {
    format!(
        "{} of {} hosts up in {:.1}s{}",
        result.count(Classification::Up),
        result.len(),
        result.elapsed.as_secs_f64(),
        if result.cancelled { " (interrupted)" } else { "" }
    )
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
