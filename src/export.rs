//! Export of statistics to JSON, CSV and plain text

use crate::probe::ProbeError;
use crate::stats::{Statistics, StatsRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Column order shared by the CSV header and the text listing
const FIELDS: [&str; 9] = [
    "host",
    "timestamp",
    "sent",
    "received",
    "packet_loss_pct",
    "min_ms",
    "max_ms",
    "avg_ms",
    "jitter_ms",
];

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON object
    Json,
    /// Header line plus one row
    Csv,
    /// Title line followed by `key: value` lines
    #[default]
    Text,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Text => write!(f, "txt"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "txt" | "text" => Ok(ExportFormat::Text),
            other => Err(ProbeError::invalid(format!("unknown export format '{other}'"))),
        }
    }
}

/// Render statistics in the requested format
///
/// # Examples
///
/// ```
/// use chrono::Local;
/// use pingsweep::{export, ExportFormat, Statistics};
///
/// let stats = Statistics {
///     target: "1.1.1.1".to_string(),
///     timestamp: Local::now(),
///     sent: 4,
///     received: 4,
///     loss_pct: 0.0,
///     min_ms: 9.8,
///     max_ms: 12.1,
///     avg_ms: 10.6,
///     jitter_ms: 0.9,
/// };
/// let csv = export(&stats, ExportFormat::Csv).unwrap();
/// assert!(csv.starts_with("host,timestamp,sent"));
/// ```
pub fn export(stats: &Statistics, format: ExportFormat) -> Result<String, ProbeError> {
    let record = stats.to_record();
    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(&record).map_err(|e| ProbeError::Export(e.to_string()))
        }
        ExportFormat::Csv => {
            let row: Vec<String> = values(&record).iter().map(|v| csv_field(v)).collect();
            Ok(format!("{}\n{}\n", FIELDS.join(","), row.join(",")))
        }
        ExportFormat::Text => {
            let mut out = format!("Ping Results - {}\n{}\n", record.timestamp, "-".repeat(40));
            for (key, value) in FIELDS.iter().zip(values(&record)) {
                out.push_str(&format!("{key}: {value}\n"));
            }
            Ok(out)
        }
    }
}

/// Render statistics and write them to `path`, replacing any existing file
pub fn export_to_file(
    path: impl AsRef<Path>,
    stats: &Statistics,
    format: ExportFormat,
) -> Result<(), ProbeError> {
    let path = path.as_ref();
    let body = export(stats, format)?;
    std::fs::write(path, body)
        .map_err(|e| ProbeError::Export(format!("{}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), %format, "exported statistics");
    Ok(())
}

fn values(record: &StatsRecord) -> [String; 9] {
    [
        record.host.clone(),
        record.timestamp.clone(),
        record.sent.to_string(),
        record.received.to_string(),
        record.packet_loss_pct.to_string(),
        record.min_ms.to_string(),
        record.max_ms.to_string(),
        record.avg_ms.to_string(),
        record.jitter_ms.to_string(),
    ]
}

/// Quote a CSV field when it contains a delimiter, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn stats(target: &str) -> Statistics {
        Statistics {
            target: target.to_string(),
            timestamp: Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
            sent: 5,
            received: 3,
            loss_pct: 40.0,
            min_ms: 10.0,
            max_ms: 20.0,
            avg_ms: 15.004,
            jitter_ms: 7.5,
        }
    }

    #[test]
    fn test_csv() {
        let out = export(&stats("10.0.0.1"), ExportFormat::Csv).unwrap();
        assert_eq!(
            out,
            "host,timestamp,sent,received,packet_loss_pct,min_ms,max_ms,avg_ms,jitter_ms\n\
             10.0.0.1,2024-03-01 12:30:05,5,3,40,10,20,15,7.5\n"
        );
    }

    #[test]
    fn test_csv_quotes_fields() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn test_json() {
        let out = export(&stats("10.0.0.1"), ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["host"], "10.0.0.1");
        assert_eq!(value["packet_loss_pct"], 40.0);
        assert_eq!(value["avg_ms"], 15.0);
        assert_eq!(value["timestamp"], "2024-03-01 12:30:05");
    }

    #[test]
    fn test_text() {
        let out = export(&stats("10.0.0.1"), ExportFormat::Text).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Ping Results - 2024-03-01 12:30:05");
        assert_eq!(lines[1], "-".repeat(40));
        assert_eq!(lines[2], "host: 10.0.0.1");
        assert!(lines.contains(&"jitter_ms: 7.5"));
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        export_to_file(&path, &stats("10.0.0.1"), ExportFormat::Csv).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("host,"));

        let err = export_to_file(dir.path(), &stats("x"), ExportFormat::Json).unwrap_err();
        assert!(matches!(err, ProbeError::Export(_)));
    }
}
