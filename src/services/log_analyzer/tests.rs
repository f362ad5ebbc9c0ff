//! End-to-end tests for the log analyzer
//!
//! Lines follow the HBase log4j layout used on the cluster nodes:
//! `2025-09-12 16:00:01,000 WARN  [thread] class: message`.

#[cfg(test)]
mod log_analyzer_tests {
    use crate::services::log_analyzer::models::*;
    use crate::services::log_analyzer::parser::specialized::ClassifierRegistry;
    use crate::services::log_analyzer::{
        DataQualityError, DetectorSettings, EventParser, NodeAnalyzer, RawMetricRow,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    /// 2025-09-12 16:00:00 UTC
    const BASE: i64 = 1_757_692_800;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(BASE + secs, 0).unwrap()
    }

    fn line(secs: i64, level: &str, msg: &str) -> String {
        format!("{} {:<5} [main] {}", at(secs).format("%Y-%m-%d %H:%M:%S,000"), level, msg)
    }

    /// One message per domain, in registry priority order
    fn domain_samples() -> Vec<(Domain, &'static str, &'static str)> {
        vec![
            (Domain::Wal, "WARN", "wal.FSHLog: Slow sync cost: 312 ms, current pipeline: []"),
            (
                Domain::Gc,
                "WARN",
                "util.JvmPauseMonitor: Detected pause in JVM or host machine (eg GC): pause of approximately 1520ms",
            ),
            (Domain::Memory, "ERROR", "regionserver.HRegionServer: java.lang.OutOfMemoryError: Java heap space"),
            (
                Domain::Replication,
                "INFO",
                "regionserver.ReplicationSource: Normal source for cluster peer1: sizeOfLogQueue=17, ageOfLastShippedOp=45000",
            ),
            (
                Domain::TimeoutRetry,
                "WARN",
                "client.RpcRetryingCaller: Call exception, tries=7, retries=16, started=38000 ms ago, method=Get, callTimeout=60000",
            ),
            (
                Domain::RpcHandler,
                "WARN",
                "ipc.RpcServer: Call queue is full on default.FPBQ.Fifo.handler=29,queue=2,port=16020",
            ),
            (Domain::Compaction, "INFO", "regionserver.HStore: Completed compaction of region r1 in 850ms"),
            (Domain::Split, "INFO", "regionserver.SplitRequest: Splitting region=t1,,1700.abc"),
            (
                Domain::Flush,
                "INFO",
                "regionserver.HRegion: Finished flush of dataSize ~1.2 MB for 1588230740 in 45ms, sequenceid=12",
            ),
            (Domain::Balancer, "INFO", "master.HMaster: Moving region abc to rs2"),
            (
                Domain::ClientConnection,
                "DEBUG",
                "ipc.ServerRpcConnection: Connection from 10.25.130.7:51234, version=2.4.17",
            ),
            (Domain::Network, "WARN", "ipc.NettyRpcConnection: java.io.IOException: Connection reset by peer"),
            (
                Domain::Performance,
                "WARN",
                r#"ipc.RpcServer: (responseTooSlow): {"call":"Multi","starttimems":1,"processingtimems":12034}"#,
            ),
            (Domain::Table, "INFO", "procedure.CreateTableProcedure: Creating table usertable"),
        ]
    }

    fn sample_lines() -> Vec<String> {
        let mut lines: Vec<String> = domain_samples()
            .iter()
            .enumerate()
            .map(|(i, (_, level, msg))| line(i as i64, level, msg))
            .collect();
        lines.push(line(20, "INFO", "regionserver.HRegionServer: Serving as rs1"));
        lines
    }

    mod classification_tests {
        use super::*;

        #[test]
        fn test_every_domain_recognized() {
            let parser = EventParser::default();
            let lines = sample_lines();
            let records: Vec<LogRecord> = parser.parse("rs1", NodeRole::RegionServer, &lines).collect();

            assert_eq!(records.len(), lines.len());
            for ((expected, _, msg), record) in domain_samples().iter().zip(&records) {
                assert_eq!(record.domain, *expected, "wrong domain for: {}", msg);
            }
            assert_eq!(records.last().unwrap().domain, Domain::Unclassified);
        }

        #[test]
        fn test_registry_covers_all_classified_domains() {
            let registry = ClassifierRegistry::new();
            let expected: Vec<Domain> = domain_samples().iter().map(|(d, _, _)| *d).collect();
            assert_eq!(registry.domains(), expected);
        }

        #[test]
        fn test_removing_one_classifier_leaves_others_untouched() {
            let lines = sample_lines();
            let full = EventParser::default();
            let reduced = EventParser::new(Arc::new(ClassifierRegistry::without(Domain::Compaction)));

            let a: Vec<LogRecord> = full.parse("rs1", NodeRole::RegionServer, &lines).collect();
            let b: Vec<LogRecord> = reduced.parse("rs1", NodeRole::RegionServer, &lines).collect();
            for (x, y) in a.iter().zip(&b) {
                if x.domain == Domain::Compaction {
                    assert_ne!(y.domain, Domain::Compaction);
                } else {
                    assert_eq!(x.domain, y.domain);
                    assert_eq!(x.extracted_fields, y.extracted_fields);
                }
            }
        }

        #[test]
        fn test_extracted_fields_flow_through() {
            let parser = EventParser::default();
            let lines = sample_lines();
            let records: Vec<LogRecord> = parser.parse("rs1", NodeRole::RegionServer, &lines).collect();

            assert_eq!(records[0].field_f64("sync_duration_ms"), Some(312.0));
            assert_eq!(records[0].severity, Severity::Warn);
            assert_eq!(records[2].severity, Severity::Error);
            assert_eq!(records[0].timestamp, at(0));
        }
    }

    mod parser_tests {
        use super::*;

        #[test]
        fn test_parse_is_idempotent() {
            let parser = EventParser::default();
            let mut lines = sample_lines();
            lines.insert(3, "\tat org.apache.hadoop.hbase.Foo.bar(Foo.java:1)".to_string());

            let first: Vec<LogRecord> = parser.parse("rs1", NodeRole::RegionServer, &lines).collect();
            let second: Vec<LogRecord> = parser.parse("rs1", NodeRole::RegionServer, &lines).collect();
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }

        #[test]
        fn test_continuation_inherits_previous_timestamp() {
            let parser = EventParser::default();
            let lines = vec![
                line(5, "ERROR", "regionserver.HRegionServer: java.lang.OutOfMemoryError: Java heap space"),
                "\tat java.util.Arrays.copyOf(Arrays.java:3236)".to_string(),
                line(9, "INFO", "regionserver.HRegionServer: Serving as rs1"),
            ];
            let mut iter = parser.parse("rs1", NodeRole::RegionServer, &lines);
            let records: Vec<LogRecord> = iter.by_ref().collect();

            assert_eq!(records[1].timestamp, at(5));
            assert_eq!(records[1].domain, Domain::Unclassified);
            assert_eq!(records[1].line_number, 2);
            assert_eq!(iter.stats().headerless, 1);
            assert!(!iter.stats().epoch_fallback);
        }

        #[test]
        fn test_line_without_level_is_still_classified() {
            let parser = EventParser::default();
            let lines = vec![format!(
                "{} NOTICE wal.FSHLog: Slow sync cost: 312 ms, current pipeline: []",
                at(1).format("%Y-%m-%d %H:%M:%S,000")
            )];
            let mut iter = parser.parse("rs1", NodeRole::RegionServer, &lines);
            let records: Vec<LogRecord> = iter.by_ref().collect();

            assert_eq!(records[0].timestamp, at(1));
            assert_eq!(records[0].severity, Severity::Unknown);
            assert_eq!(records[0].domain, Domain::Wal);
            assert_eq!(records[0].field_f64("sync_duration_ms"), Some(312.0));
            assert_eq!(iter.stats().headerless, 1);
        }

        #[test]
        fn test_leading_headerless_line_gets_earliest_timestamp() {
            let parser = EventParser::default();
            let lines = vec![
                "Caused by: java.net.SocketTimeoutException".to_string(),
                line(30, "INFO", "regionserver.HRegionServer: Serving as rs1"),
                line(12, "INFO", "regionserver.HRegionServer: Serving as rs1"),
            ];
            let records: Vec<LogRecord> = parser.parse("rs1", NodeRole::RegionServer, &lines).collect();
            assert_eq!(records[0].timestamp, at(12));
        }

        #[test]
        fn test_no_timestamp_falls_back_to_epoch() {
            let parser = EventParser::default();
            let lines = vec!["garbage", "more garbage"];
            let mut iter = parser.parse("rs1", NodeRole::RegionServer, &lines);
            let records: Vec<LogRecord> = iter.by_ref().collect();

            assert_eq!(records.len(), 2);
            assert!(records.iter().all(|r| r.timestamp == DateTime::<Utc>::UNIX_EPOCH));
            assert!(records.iter().all(|r| r.domain == Domain::Unclassified));
            assert_eq!(records[0].raw_text, "garbage");
            assert!(iter.stats().epoch_fallback);
        }

        #[test]
        fn test_invalid_utf8_is_replaced_not_dropped() {
            let parser = EventParser::default();
            let mut bad = line(1, "WARN", "wal.FSHLog: Slow sync cost: 312 ms, current pipeline: []").into_bytes();
            bad.extend_from_slice(&[0xff, 0xfe]);
            let lines = vec![bad];
            let records: Vec<LogRecord> = parser.parse("rs1", NodeRole::RegionServer, &lines).collect();

            assert_eq!(records.len(), 1);
            assert_eq!(records[0].domain, Domain::Wal);
            assert!(records[0].raw_text.contains('\u{FFFD}'));
        }

        #[test]
        fn test_empty_input_yields_nothing() {
            let parser = EventParser::default();
            let lines: Vec<String> = Vec::new();
            assert_eq!(parser.parse("rs1", NodeRole::RegionServer, &lines).count(), 0);
        }
    }

    mod node_analyzer_tests {
        use super::*;

        /// 1000 lines at 1/s; three of every five are slow WAL syncs
        fn wal_scenario() -> Vec<String> {
            (0..1000)
                .map(|i| {
                    if i % 5 < 3 {
                        line(i, "WARN", "wal.FSHLog: Slow sync cost: 300 ms, current pipeline: []")
                    } else {
                        line(i, "INFO", "regionserver.HRegionServer: Serving as rs1")
                    }
                })
                .collect()
        }

        #[test]
        fn test_wal_scenario_single_breach() {
            let analyzer = NodeAnalyzer::new(DetectorSettings::default(), None, Vec::new());
            let cancel = AtomicBool::new(false);
            let analysis = analyzer
                .analyze("rs1", NodeRole::RegionServer, &wal_scenario(), Vec::new(), &cancel)
                .unwrap();

            assert_eq!(analysis.summary.total_records(), 1000);
            assert_eq!(analysis.findings.len(), 1);
            let finding = &analysis.findings[0];
            assert_eq!(finding.domain(), Domain::Wal);
            assert_eq!(finding.kind(), AnomalyKind::ThresholdBreach);
            assert_eq!(finding.evidence_count(), 600);
            assert_eq!(finding.supporting_records().len(), 50);
            assert!(analysis.notes.is_empty());
        }

        #[test]
        fn test_window_filters_records_and_samples() {
            let window = TimeWindow::new(at(0), at(99));
            let analyzer = NodeAnalyzer::new(DetectorSettings::default(), Some(window), Vec::new());
            let rows = vec![
                RawMetricRow::new("rpc_handler_active", at(30), 60.0),
                RawMetricRow::new("rpc_handler_active", at(500), 60.0),
            ];
            let cancel = AtomicBool::new(false);
            let analysis = analyzer
                .analyze("rs1", NodeRole::RegionServer, &wal_scenario(), rows, &cancel)
                .unwrap();

            assert_eq!(analysis.summary.total_records(), 100);
            let rpc: Vec<&AnomalyFinding> =
                analysis.findings.iter().filter(|f| f.domain() == Domain::RpcHandler).collect();
            assert_eq!(rpc.len(), 1);
            assert_eq!(rpc[0].evidence_count(), 1);
            assert!(analysis.findings.iter().all(|f| window.contains(f.window().start)));
        }

        #[test]
        fn test_focus_keeps_only_named_domains() {
            let analyzer = NodeAnalyzer::new(DetectorSettings::default(), None, vec![Domain::Gc]);
            let cancel = AtomicBool::new(false);
            let analysis = analyzer
                .analyze("rs1", NodeRole::RegionServer, &wal_scenario(), Vec::new(), &cancel)
                .unwrap();

            assert!(analysis.findings.is_empty());
            // Summaries still see every record
            assert_eq!(analysis.summary.total_records(), 1000);
        }

        #[test]
        fn test_cancel_flag_stops_analysis() {
            let analyzer = NodeAnalyzer::new(DetectorSettings::default(), None, Vec::new());
            let lines: Vec<String> = (0..5000).map(|i| line(i, "INFO", "Serving as rs1")).collect();
            let cancel = AtomicBool::new(true);
            assert!(analyzer.analyze("rs1", NodeRole::RegionServer, &lines, Vec::new(), &cancel).is_none());
        }

        #[test]
        fn test_cancel_flag_stops_metric_detection() {
            let analyzer = NodeAnalyzer::new(DetectorSettings::default(), None, Vec::new());
            let lines: Vec<String> = Vec::new();
            let rows: Vec<RawMetricRow> =
                (0..10).map(|i| RawMetricRow::new("rpc_handler_active", at(i * 60), 60.0)).collect();
            let cancel = AtomicBool::new(true);
            assert!(analyzer.analyze("rs1", NodeRole::RegionServer, &lines, rows, &cancel).is_none());
        }

        #[test]
        fn test_data_quality_notes_collected() {
            let analyzer = NodeAnalyzer::new(DetectorSettings::default(), None, Vec::new());
            let lines = vec!["no header here"];
            let rows = vec![RawMetricRow::new("rpc_handler_active", at(0), f64::NAN)];
            let cancel = AtomicBool::new(false);
            let analysis =
                analyzer.analyze("rs1", NodeRole::RegionServer, &lines, rows, &cancel).unwrap();

            assert!(analysis.notes.contains(&DataQualityError::NoTimestamp { node_id: "rs1".into() }));
            assert!(analysis.notes.contains(&DataQualityError::HeaderlessLines {
                node_id: "rs1".into(),
                headerless: 1,
            }));
            assert!(analysis.notes.iter().any(|n| matches!(n, DataQualityError::NonFiniteValue { .. })));
            assert!(analysis.findings.is_empty());
        }
    }
}
