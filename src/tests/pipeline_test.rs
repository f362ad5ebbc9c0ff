// Full pipeline tests: topology → node units → aggregation → ranking

use super::common::*;
use crate::services::log_analyzer::AnalysisError;
use crate::services::log_analyzer::models::{AnomalyKind, Domain};
use crate::services::sources::StaticTopology;
use crate::services::DiagnosisService;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_wal_scenario_yields_one_hypothesis() {
    let node = core_node(1);
    let source = MockSource::new().with_logs(&node.node_id, wal_scenario());
    let service = DiagnosisService::new(&test_config(), topology(vec![node]), Arc::new(source)).unwrap();

    let report = service.run().await.unwrap();

    assert_eq!(report.nodes_processed, 1);
    assert!(report.partial_nodes.is_empty());
    assert_eq!(report.total_records, 1000);
    assert_eq!(report.anomalies_found, 1);
    assert_eq!(report.hypotheses.len(), 1);

    let h = &report.hypotheses[0];
    assert_eq!(h.rank, 1);
    assert_eq!(h.primary_domain, Domain::Wal);
    assert_eq!(h.kinds, vec![AnomalyKind::ThresholdBreach]);
    assert_eq!(h.total_evidence, 600);
    assert_eq!(h.window.start, at(0));
    assert!(h.upstream_domains.is_empty());
}

#[tokio::test]
async fn test_same_domain_merges_across_nodes() {
    let nodes = vec![core_node(1), core_node(2), core_node(3)];
    let source = nodes
        .iter()
        .fold(MockSource::new(), |s, n| s.with_logs(&n.node_id, wal_scenario()));
    let service = DiagnosisService::new(&test_config(), topology(nodes), Arc::new(source)).unwrap();

    let report = service.run().await.unwrap();

    assert_eq!(report.nodes_processed, 3);
    assert_eq!(report.anomalies_found, 3);
    assert_eq!(report.hypotheses.len(), 1);
    assert_eq!(report.hypotheses[0].nodes, vec!["ip-10-0-0-1", "ip-10-0-0-2", "ip-10-0-0-3"]);
    assert_eq!(report.event_summary.by_node.len(), 3);
}

#[tokio::test]
async fn test_empty_input_is_not_an_error() {
    let node = core_node(1);
    let service =
        DiagnosisService::new(&test_config(), topology(vec![node]), Arc::new(MockSource::new())).unwrap();

    let report = service.run().await.unwrap();

    assert_eq!(report.nodes_processed, 1);
    assert_eq!(report.total_records, 0);
    assert!(report.hypotheses.is_empty());
    assert_eq!(report.error_summary.total, 0);
}

#[tokio::test]
async fn test_slow_node_is_partial() {
    let fast = core_node(1);
    let slow = core_node(2);
    let source = MockSource::new()
        .with_logs(&fast.node_id, wal_scenario())
        .with_logs(&slow.node_id, wal_scenario())
        .with_delay(&slow.node_id, Duration::from_secs(30));
    let mut config = test_config();
    config.analysis.node_task_budget_secs = 1;
    let service =
        DiagnosisService::new(&config, topology(vec![fast, slow.clone()]), Arc::new(source)).unwrap();

    let started = Instant::now();
    let report = service.run().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(report.nodes_processed, 1);
    assert_eq!(report.partial_nodes.len(), 1);
    assert_eq!(report.partial_nodes[0].node_id, slow.node_id);
    assert!(report.partial_nodes[0].reason.contains("budget"));
    assert_eq!(report.hypotheses.len(), 1);
    assert_eq!(report.hypotheses[0].nodes, vec!["ip-10-0-0-1"]);
}

#[tokio::test]
async fn test_fetch_failure_is_partial() {
    let good = core_node(1);
    let bad = core_node(2);
    let source = MockSource::new()
        .with_logs(&good.node_id, wal_scenario())
        .with_failure(&bad.node_id);
    let service = DiagnosisService::new(&test_config(), topology(vec![good, bad]), Arc::new(source)).unwrap();

    let report = service.run().await.unwrap();

    assert_eq!(report.nodes_processed, 1);
    assert_eq!(report.partial_nodes[0].node_id, "ip-10-0-0-2");
    assert!(report.partial_nodes[0].reason.starts_with("log fetch failed"));
    assert_eq!(report.hypotheses.len(), 1);
}

#[tokio::test]
async fn test_missing_topology() {
    let empty = DiagnosisService::new(
        &test_config(),
        Arc::new(StaticTopology::default()),
        Arc::new(MockSource::new()),
    )
    .unwrap();
    assert!(matches!(empty.run().await, Err(AnalysisError::MissingTopology(_))));

    let broken =
        DiagnosisService::new(&test_config(), Arc::new(BrokenTopology), Arc::new(MockSource::new())).unwrap();
    assert!(matches!(broken.run().await, Err(AnalysisError::MissingTopology(_))));
}

#[tokio::test]
async fn test_target_nodes_restrict_scope() {
    let nodes = vec![core_node(1), core_node(2)];
    let source = nodes
        .iter()
        .fold(MockSource::new(), |s, n| s.with_logs(&n.node_id, wal_scenario()));
    let source = Arc::new(source);

    let mut config = test_config();
    config.analysis.target_nodes = vec!["ip-10-0-0-2".to_string()];
    let service = DiagnosisService::new(&config, topology(nodes.clone()), source.clone()).unwrap();
    let report = service.run().await.unwrap();
    assert_eq!(report.nodes_processed, 1);
    assert_eq!(report.hypotheses[0].nodes, vec!["ip-10-0-0-2"]);

    config.analysis.target_nodes = vec!["ip-10-9-9-9".to_string()];
    let service = DiagnosisService::new(&config, topology(nodes), source).unwrap();
    assert!(matches!(service.run().await, Err(AnalysisError::MissingTopology(_))));
}

#[tokio::test]
async fn test_window_and_focus() {
    let node = core_node(1);
    let source = Arc::new(MockSource::new().with_logs(&node.node_id, wal_scenario()));

    let mut config = test_config();
    config.analysis.window_start = Some("2025-09-12 16:00:00".to_string());
    config.analysis.window_end = Some("2025-09-12 16:01:39".to_string());
    let service = DiagnosisService::new(&config, topology(vec![node.clone()]), source.clone()).unwrap();
    let report = service.run().await.unwrap();
    assert_eq!(report.total_records, 100);
    assert_eq!(report.window.map(|w| w.end), Some(at(99)));
    assert_eq!(report.hypotheses[0].total_evidence, 60);

    let mut config = test_config();
    config.analysis.focus_domains = vec![Domain::Gc];
    let service = DiagnosisService::new(&config, topology(vec![node]), source).unwrap();
    let report = service.run().await.unwrap();
    assert_eq!(report.total_records, 1000);
    assert!(report.hypotheses.is_empty());
}

#[tokio::test]
async fn test_invalid_config_rejected_before_run() {
    let mut config = test_config();
    config.ranking.top_n = 0;
    let result = DiagnosisService::new(&config, topology(vec![core_node(1)]), Arc::new(MockSource::new()));
    assert!(matches!(result, Err(AnalysisError::Configuration(_))));
}
