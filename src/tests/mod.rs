//! Cross-module tests for pingsweep

#[cfg(test)]
mod pipeline_tests {
    use crate::probe::{Platform, Prober, Script, ScriptedRunner};
    use crate::{
        export, summarize, Classification, ExportFormat, HistoryStore, MemoryHistoryStore,
        ProbeRequest, ThresholdAlert, Thresholds,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn windows_prober(script: Script) -> Prober {
        Prober::with_runner(Arc::new(ScriptedRunner::new().with_default(script)))
            .with_platform(Platform::Windows)
    }

    #[tokio::test]
    async fn test_windows_output_to_history() {
        let prober = windows_prober(
            Script::new()
                .line("Pinging 10.0.0.5 with 32 bytes of data:")
                .line("Reply from 10.0.0.5: bytes=32 time=10ms TTL=128")
                .line("Request timed out.")
                .line("Reply from 10.0.0.5: bytes=32 time<1ms TTL=128")
                .line("Reply from 10.0.0.5: bytes=32 time=20ms TTL=128")
                .line("")
                .line("Ping statistics for 10.0.0.5:")
                .line("    Packets: Sent = 4, Received = 3, Lost = 1 (25% loss),")
                .line("Approximate round trip times in milli-seconds:")
                .line("    Minimum = 0ms, Maximum = 20ms, Average = 10ms")
                .exit_code(0),
        );
        let request = ProbeRequest::builder()
            .target("10.0.0.5")
            .count(4)
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap();

        let outcome = prober.probe_once(&request).await.unwrap();
        assert_eq!(outcome.classification, Classification::Up);
        assert_eq!(outcome.latencies(), vec![10.0, 1.0, 20.0]);

        let stats = summarize(&outcome).unwrap();
        assert_eq!(stats.sent, 4);
        assert_eq!(stats.received, 3);
        assert_eq!(stats.loss_pct, 25.0);
        assert_eq!(stats.jitter_ms, 14.0);

        let alerts = Thresholds::default().evaluate(&stats);
        assert_eq!(alerts, vec![ThresholdAlert::HighLoss(25.0)]);

        let store = MemoryHistoryStore::new();
        store.save(&stats).unwrap();
        let records = store.query(5).unwrap();
        assert_eq!(records[0], stats.to_record());

        let csv = export(&stats, ExportFormat::Csv).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("10.0.0.5,"));
    }

    #[tokio::test]
    async fn test_down_host_has_no_statistics() {
        let prober = windows_prober(
            Script::new()
                .line("Request timed out.")
                .line("Destination host unreachable.")
                .exit_code(1),
        );
        let request = ProbeRequest::builder()
            .target("10.0.0.6")
            .count(2)
            .build()
            .unwrap();

        let outcome = prober.probe_once(&request).await.unwrap();
        assert_eq!(outcome.classification, Classification::Down);
        assert!(summarize(&outcome).is_none());
    }
}
