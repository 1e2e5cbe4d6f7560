//! Tests for main.rs functionality

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::*;
    use chrono::Local;
    use clap::Parser;
    use pingsweep::probe::ProbeCount;
    use pingsweep::Sample;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("pingsweep").chain(argv.iter().copied())).unwrap()
    }

    fn stats() -> Statistics {
        Statistics {
            target: "10.0.0.1".to_string(),
            timestamp: Local::now(),
            sent: 5,
            received: 3,
            loss_pct: 40.0,
            min_ms: 10.0,
            max_ms: 20.0,
            avg_ms: 15.0,
            jitter_ms: 7.5,
        }
    }

    #[test]
    fn test_get_version() {
        let version = get_version();
        assert!(!version.is_empty());

        #[cfg(debug_assertions)]
        assert!(version.ends_with("-UNRELEASED"));

        #[cfg(not(debug_assertions))]
        assert!(!version.contains("UNRELEASED"));
    }

    #[test]
    fn test_args_parsing() {
        let args = parse(&["-c", "5", "-s", "64", "-t", "1.5", "8.8.8.8"]);
        assert_eq!(args.host.as_deref(), Some("8.8.8.8"));
        assert_eq!(args.count, Some(5));
        assert_eq!(args.size, Some(64));
        assert_eq!(args.timeout, Some(1.5));
        assert_eq!(args.format, FormatArg::Txt);

        let args = parse(&["-m", "10.0.0.1", "10.0.0.2", "--threads", "4"]);
        assert!(args.host.is_none());
        assert_eq!(args.multi, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(args.threads, Some(4));

        let args = parse(&["-S", "192.168.1.0/30", "--json"]);
        assert_eq!(args.sweep.as_deref(), Some("192.168.1.0/30"));
        assert!(args.json);

        assert!(parse(&["-H"]).history);
    }

    #[test]
    fn test_args_conflicts() {
        // A target is required unless another mode is chosen
        assert!(Args::try_parse_from(["pingsweep"]).is_err());
        assert!(Args::try_parse_from(["pingsweep", "-C", "-c", "3", "host"]).is_err());
        assert!(Args::try_parse_from(["pingsweep", "-f", "xml", "host"]).is_err());

        // Continuous mode only makes sense for a single host
        assert!(Args::try_parse_from(["pingsweep", "-C", "-m", "a", "b"]).is_err());
        assert!(Args::try_parse_from(["pingsweep", "-C", "-S", "10.0.0.0/30"]).is_err());
    }

    #[test]
    fn test_build_probe_request_uses_config_defaults() {
        let config = AppConfig::from_yaml("ping:\n  count: 7\n  timeout: 3s\n").unwrap();

        let request = build_probe_request(&parse(&["example.com"]), &config, "example.com").unwrap();
        assert_eq!(request.count, ProbeCount::Fixed(7));
        assert_eq!(request.timeout, Duration::from_secs(3));
        assert_eq!(request.packet_size, 32);

        let args = parse(&["-c", "2", "-t", "0.5", "example.com"]);
        let request = build_probe_request(&args, &config, "example.com").unwrap();
        assert_eq!(request.count, ProbeCount::Fixed(2));
        assert_eq!(request.timeout, Duration::from_millis(500));

        let args = parse(&["-C", "example.com"]);
        let request = build_probe_request(&args, &config, "example.com").unwrap();
        assert!(request.count.is_continuous());
    }

    #[test]
    fn test_build_probe_request_rejects_bad_values() {
        let config = AppConfig::default();
        assert!(build_probe_request(&parse(&["-t", "0", "h"]), &config, "h").is_err());
        assert!(build_probe_request(&parse(&["-c", "0", "h"]), &config, "h").is_err());
        assert!(build_probe_request(&parse(&["h"]), &config, "-h").is_err());
    }

    #[test]
    fn test_build_sweep_config() {
        let config = AppConfig::default();

        let quick = build_sweep_config(&parse(&["-S", "10.0.0.0/30"]), &config, true).unwrap();
        assert_eq!(quick.count, 1);
        assert_eq!(quick.per_host_timeout, Duration::from_secs(1));
        assert_eq!(quick.concurrency, 10);

        let args = parse(&["-m", "a", "b", "--threads", "3"]);
        let full = build_sweep_config(&args, &config, false).unwrap();
        assert_eq!(full.count, 1);
        assert_eq!(full.per_host_timeout, Duration::from_secs(2));
        assert_eq!(full.concurrency, 3);

        // ping.count only applies to single-host runs
        let counted = AppConfig::from_yaml("ping:\n  count: 9\n").unwrap();
        let multi = build_sweep_config(&parse(&["-m", "a"]), &counted, false).unwrap();
        assert_eq!(multi.count, 1);
        let multi = build_sweep_config(&parse(&["-c", "3", "-m", "a"]), &counted, false).unwrap();
        assert_eq!(multi.count, 3);
        let quick = build_sweep_config(&parse(&["-c", "2", "-S", "10.0.0.0/30"]), &counted, true)
            .unwrap();
        assert_eq!(quick.count, 2);

        let args = parse(&["-S", "10.0.0.0/30", "--threads", "0"]);
        assert!(build_sweep_config(&args, &config, true).is_err());
    }

    #[test]
    fn test_format_event() {
        let sample = ProbeEvent {
            target: "10.0.0.1".to_string(),
            line: "64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=14.2 ms".to_string(),
            parsed: ParsedLine::Sample(14.2),
            sample: Some(Sample {
                seq: 0,
                latency_ms: 14.2,
            }),
        };
        assert_eq!(
            format_event(&sample).unwrap(),
            "Reply from 10.0.0.1: seq=0 time=14.20 ms"
        );

        let info = ProbeEvent {
            target: "10.0.0.1".to_string(),
            line: "PING 10.0.0.1 (10.0.0.1) 32(60) bytes of data.".to_string(),
            parsed: ParsedLine::Info,
            sample: None,
        };
        assert!(format_event(&info).is_none());
    }

    #[test]
    fn test_format_statistics() {
        let text = format_statistics(&stats());
        assert!(text.contains("5 packets transmitted, 3 received, 40% packet loss"));
        assert!(text.contains("rtt min/avg/max = 10.00/15.00/20.00 ms, jitter 7.50 ms"));
    }

    #[test]
    fn test_format_history() {
        assert_eq!(format_history(&[]), "No history recorded yet\n");

        let text = format_history(&[stats().to_record()]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("TIME"));
        assert!(lines[1].contains("10.0.0.1"));
        assert!(lines[1].contains("40.0"));
    }

    #[test]
    fn test_host_table_and_footer() {
        let mut result = SweepResult::new();
        result.insert(HostSummary {
            target: "10.0.0.1".to_string(),
            classification: Classification::Up,
            sent: 1,
            received: 1,
            avg_ms: Some(1.234),
            error: None,
        });
        result.insert(HostSummary::failed("10.0.0.2", "Probe timed out"));

        let table = format_host_table(&result.sorted());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("UP") && lines[1].contains("1.23 ms"));
        assert!(lines[2].contains("ERROR"));

        assert!(format_sweep_footer(&result).starts_with("1 of 2 hosts up"));
        result.cancelled = true;
        assert!(format_sweep_footer(&result).ends_with("(interrupted)"));
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "scanner:\n  threads: 2\n").unwrap();

        let args = parse(&["--config", path.to_str().unwrap(), "host"]);
        assert_eq!(load_config(&args).unwrap().scanner.threads, 2);

        let missing = dir.path().join("missing.yaml");
        let args = parse(&["--config", missing.to_str().unwrap(), "host"]);
        assert!(load_config(&args).is_err());
    }
}
