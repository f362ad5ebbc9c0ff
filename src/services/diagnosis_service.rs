// Diagnosis Service
// Purpose: Run the analysis pipeline over every node of the cluster
// Design: One tokio task per node (fetch → parse → detect), bounded by a
//         semaphore and a per-node budget; results flow over one mpsc channel
//         into a single aggregator, ranking runs after all units are done

use crate::config::Config;
use crate::services::log_analyzer::models::{DiagnosisReport, PartialNode, TimeWindow};
use crate::services::log_analyzer::{
    AnalysisError, AnalysisResult, DetectorSettings, NodeAnalysis, NodeAnalyzer, RecordSummary,
    RootCauseRanker,
};
use crate::services::sources::{ClusterNode, RawDataSource, TopologySource};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc};
use uuid::Uuid;

/// Result of one node unit
#[derive(Debug)]
enum NodeOutcome {
    Completed(Box<NodeAnalysis>),
    Partial(String),
}

pub struct DiagnosisService {
    analyzer: Arc<NodeAnalyzer>,
    ranker: RootCauseRanker,
    topology: Arc<dyn TopologySource>,
    source: Arc<dyn RawDataSource>,
    window: Option<TimeWindow>,
    target_nodes: Vec<String>,
    node_budget: Duration,
    max_concurrent_nodes: usize,
}

impl DiagnosisService {
    /// Validates the configuration before anything is fetched
    pub fn new(
        config: &Config,
        topology: Arc<dyn TopologySource>,
        source: Arc<dyn RawDataSource>,
    ) -> AnalysisResult<Self> {
        config.validate()?;
        let window = config.analysis_window()?;
        let ranker = RootCauseRanker::from_config(config)?;
        let analyzer = NodeAnalyzer::new(
            DetectorSettings::from_config(config),
            window,
            config.analysis.focus_domains.clone(),
        );

        Ok(Self {
            analyzer: Arc::new(analyzer),
            ranker,
            topology,
            source,
            window,
            target_nodes: config.analysis.target_nodes.clone(),
            node_budget: Duration::from_secs(config.analysis.node_task_budget_secs),
            max_concurrent_nodes: config.analysis.max_concurrent_nodes,
        })
    }

    /// Run one full diagnosis
    pub async fn run(&self) -> AnalysisResult<DiagnosisReport> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let nodes = self.resolve_nodes().await?;
        tracing::info!("Diagnosis {} started over {} node(s)", run_id, nodes.len());

        let expected: BTreeSet<String> = nodes.iter().map(|n| n.node_id.clone()).collect();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_nodes.max(1)));
        let (tx, mut rx) = mpsc::channel::<(String, NodeOutcome)>(nodes.len().max(1));

        for node in nodes {
            let tx = tx.clone();
            let semaphore = semaphore.clone();
            let analyzer = self.analyzer.clone();
            let source = self.source.clone();
            let window = self.window;
            let budget = self.node_budget;

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let node_id = node.node_id.clone();
                let outcome = Self::run_node(analyzer, source, node, window, budget).await;
                if tx.send((node_id, outcome)).await.is_err() {
                    tracing::warn!("Aggregator gone before node result was delivered");
                }
            });
        }
        drop(tx);

        // Single writer: only this loop touches the aggregates
        let mut findings = Vec::new();
        let mut summary = RecordSummary::default();
        let mut partial_nodes = Vec::new();
        let mut data_quality_notes = 0u64;
        let mut reported: BTreeSet<String> = BTreeSet::new();

        while let Some((node_id, outcome)) = rx.recv().await {
            reported.insert(node_id.clone());
            match outcome {
                NodeOutcome::Completed(analysis) => {
                    let analysis = *analysis;
                    tracing::debug!(
                        "Node {} completed with {} finding(s)",
                        node_id,
                        analysis.findings.len()
                    );
                    findings.extend(analysis.findings);
                    summary.merge(analysis.summary);
                    data_quality_notes += analysis.notes.len() as u64;
                },
                NodeOutcome::Partial(reason) => {
                    tracing::warn!("Node {} is partial: {}", node_id, reason);
                    partial_nodes.push(PartialNode { node_id, reason });
                },
            }
        }

        // A node task that died before reporting still has to show up
        for node_id in expected.difference(&reported) {
            tracing::warn!("Node {} never reported a result", node_id);
            partial_nodes.push(PartialNode {
                node_id: node_id.clone(),
                reason: "node task aborted".to_string(),
            });
        }
        partial_nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        let hypotheses = self.ranker.rank(&findings);
        let nodes_processed = expected.len() - partial_nodes.len();

        tracing::info!(
            "Diagnosis {} finished in {:?}: {} node(s), {} partial, {} record(s), {} finding(s), {} hypothesis(es)",
            run_id,
            started.elapsed(),
            nodes_processed,
            partial_nodes.len(),
            summary.total_records(),
            findings.len(),
            hypotheses.len()
        );

        Ok(DiagnosisReport {
            run_id,
            window: self.window,
            nodes_processed,
            total_records: summary.total_records(),
            anomalies_found: findings.len(),
            partial_nodes,
            hypotheses,
            event_summary: summary.event_summary(),
            error_summary: summary.error_summary(),
            data_quality_notes,
        })
    }

    /// Topology filtered to the target nodes; empty is fatal
    async fn resolve_nodes(&self) -> AnalysisResult<Vec<ClusterNode>> {
        let nodes = self
            .topology
            .list_nodes()
            .await
            .map_err(|e| AnalysisError::MissingTopology(e.to_string()))?;
        if nodes.is_empty() {
            return Err(AnalysisError::MissingTopology("topology source returned no nodes".into()));
        }
        if self.target_nodes.is_empty() {
            return Ok(nodes);
        }

        let selected: Vec<ClusterNode> =
            nodes.into_iter().filter(|n| self.target_nodes.contains(&n.node_id)).collect();
        if selected.is_empty() {
            return Err(AnalysisError::MissingTopology(format!(
                "none of the target nodes {:?} is in the topology",
                self.target_nodes
            )));
        }
        Ok(selected)
    }

    /// One node under its budget; expiry raises the cancel flag for the parser
    async fn run_node(
        analyzer: Arc<NodeAnalyzer>,
        source: Arc<dyn RawDataSource>,
        node: ClusterNode,
        window: Option<TimeWindow>,
        budget: Duration,
    ) -> NodeOutcome {
        let cancel = Arc::new(AtomicBool::new(false));
        let unit = Self::node_unit(analyzer, source, node, window, cancel.clone());

        match tokio::time::timeout(budget, unit).await {
            Ok(Ok(analysis)) => NodeOutcome::Completed(Box::new(analysis)),
            Ok(Err(reason)) => NodeOutcome::Partial(reason),
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                NodeOutcome::Partial(format!("exceeded node task budget of {}s", budget.as_secs()))
            },
        }
    }

    async fn node_unit(
        analyzer: Arc<NodeAnalyzer>,
        source: Arc<dyn RawDataSource>,
        node: ClusterNode,
        window: Option<TimeWindow>,
        cancel: Arc<AtomicBool>,
    ) -> Result<NodeAnalysis, String> {
        let lines = source
            .fetch_logs(&node, window)
            .await
            .map_err(|e| format!("log fetch failed: {}", e))?;
        let rows = source
            .fetch_metrics(&node, window)
            .await
            .map_err(|e| format!("metric fetch failed: {}", e))?;
        tracing::debug!("Node {}: {} line(s), {} metric row(s)", node.node_id, lines.len(), rows.len());

        let role = node.log_role();
        let node_id = node.node_id;
        let handle = tokio::task::spawn_blocking(move || {
            analyzer.analyze(&node_id, role, &lines, rows, &cancel)
        });

        match handle.await {
            Ok(Some(analysis)) => Ok(analysis),
            Ok(None) => Err("analysis cancelled".to_string()),
            Err(e) if e.is_panic() => Err("analysis panicked".to_string()),
            Err(e) => Err(format!("analysis task failed: {}", e)),
        }
    }
}
