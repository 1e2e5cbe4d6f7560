//! Logger setup for the command-line tool

use chrono::Local;
use std::fmt;
use std::fs::File;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{fmt as tfmt, registry, Layer};

/// Local wall-clock timestamps (`YYYY-MM-DD HH:MM:SS.mmm`)
pub struct LocalDateTime;

impl FormatTime for LocalDateTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Parse a level name, defaulting to WARN for anything unrecognized
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::WARN)
}

/// Console level for a `-v` count, starting from the configured level
pub fn level_for_verbosity(base: LevelFilter, verbose: u8) -> LevelFilter {
    match verbose {
        0 => base,
        1 => LevelFilter::INFO.max(base),
        2 => LevelFilter::DEBUG.max(base),
        _ => LevelFilter::TRACE,
    }
}

/// Default log file name inside the app directory
pub const LOG_FILE_NAME: &str = "pingsweep.log";

/// Level written to the log file: INFO, or lower when the console is more verbose
pub fn file_level(console: LevelFilter) -> LevelFilter {
    LevelFilter::INFO.max(console)
}

/// Open `path` for appending, creating missing parent directories
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    File::options().create(true).append(true).open(path)
}

fn pingsweep_only(level: LevelFilter) -> Targets {
    Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target("pingsweep", level)
}

/// Install the global subscriber
///
/// Console records at `level` go to stderr so that stdout stays
/// machine-readable. When `log_file` is given, records at [`file_level`]
/// are also appended to it. A log file that cannot be opened is reported
/// on the console and otherwise skipped.
pub fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> anyhow::Result<()> {
    let console = tfmt::layer()
        .with_target(false)
        .with_timer(LocalDateTime)
        .with_writer(std::io::stderr)
        .with_filter(pingsweep_only(level));

    let (file, open_error) = match log_file.map(|path| (path, open_log_file(path))) {
        Some((_, Ok(file))) => (Some(file), None),
        Some((path, Err(e))) => (None, Some((path, e))),
        None => (None, None),
    };

    let file_layer = file.map(|file| {
        tfmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_timer(LocalDateTime)
            .with_writer(file)
            .with_filter(pingsweep_only(file_level(level)))
    });

    registry().with(console).with(file_layer).try_init()?;

    if let Some((path, e)) = open_error {
        tracing::warn!(path = %path.display(), error = %e, "log file unavailable");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::DEBUG);
        assert_eq!(parse_level("INFO"), LevelFilter::INFO);
        assert_eq!(parse_level("nonsense"), LevelFilter::WARN);
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(level_for_verbosity(LevelFilter::WARN, 0), LevelFilter::WARN);
        assert_eq!(level_for_verbosity(LevelFilter::WARN, 1), LevelFilter::INFO);
        assert_eq!(level_for_verbosity(LevelFilter::WARN, 2), LevelFilter::DEBUG);
        assert_eq!(level_for_verbosity(LevelFilter::ERROR, 5), LevelFilter::TRACE);
        // -v never lowers an already verbose configuration
        assert_eq!(level_for_verbosity(LevelFilter::DEBUG, 1), LevelFilter::DEBUG);
    }

    #[test]
    fn test_file_level_is_at_least_info() {
        assert_eq!(file_level(LevelFilter::WARN), LevelFilter::INFO);
        assert_eq!(file_level(LevelFilter::OFF), LevelFilter::INFO);
        assert_eq!(file_level(LevelFilter::DEBUG), LevelFilter::DEBUG);
    }

    #[test]
    fn test_open_log_file_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(LOG_FILE_NAME);

        let mut file = open_log_file(&path).unwrap();
        std::io::Write::write_all(&mut file, b"first\n").unwrap();
        drop(file);

        // Reopening appends instead of truncating
        let mut file = open_log_file(&path).unwrap();
        std::io::Write::write_all(&mut file, b"second\n").unwrap();
        drop(file);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
