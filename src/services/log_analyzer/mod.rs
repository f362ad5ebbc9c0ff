//! HBase Log Analyzer
//!
//! Parses, classifies and scans per-node HBase logs and metrics for
//! anomalies, then ranks cross-node causal hypotheses.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 NodeAnalyzer (one per node)                  │
//! │                                                              │
//! │  raw lines ─▶ EventParser ─▶ ClassifierRegistry ─┐           │
//! │                                                  ▼           │
//! │                                           LogDetectors ──┐   │
//! │  metric rows ─▶ MetricSeriesLoader ─▶ detect_metric_series ─┤│
//! │                                                          ▼   │
//! │                                            NodeAnalysis      │
//! └──────────────────────────────────────────────────────────────┘
//!                               │ (all nodes)
//!                               ▼
//!                       RootCauseRanker ─▶ CausalHypothesis × N
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use hbase_insight::services::log_analyzer::{NodeAnalyzer, models::NodeRole};
//!
//! let analyzer = NodeAnalyzer::new(settings, None, Vec::new());
//! let cancel = AtomicBool::new(false);
//! let result = analyzer.analyze("ip-10-0-0-1", NodeRole::RegionServer, &lines, rows, &cancel);
//! ```

pub mod analyzer;
pub mod error;
pub mod metrics;
pub mod models;
pub mod parser;

#[cfg(test)]
mod tests;

pub use analyzer::{DetectorSettings, LogDetectors, RecordSummary, RootCauseRanker};
pub use error::{AnalysisError, AnalysisResult, DataQualityError, SourceError};
pub use metrics::{MetricSeriesLoader, RawMetricRow};
pub use parser::EventParser;

use models::{AnomalyFinding, Domain, NodeRole, TimeWindow};
use std::sync::atomic::{AtomicBool, Ordering};

/// Records between two checks of the cancellation flag
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Everything one node contributed to the run
#[derive(Debug, Clone)]
pub struct NodeAnalysis {
    pub node_id: String,
    pub findings: Vec<AnomalyFinding>,
    pub summary: RecordSummary,
    pub notes: Vec<DataQualityError>,
}

/// Synchronous per-node pipeline, run on a blocking thread
#[derive(Clone)]
pub struct NodeAnalyzer {
    parser: EventParser,
    settings: DetectorSettings,
    window: Option<TimeWindow>,
    focus: Vec<Domain>,
}

impl NodeAnalyzer {
    pub fn new(settings: DetectorSettings, window: Option<TimeWindow>, focus: Vec<Domain>) -> Self {
        Self { parser: EventParser::default(), settings, window, focus }
    }

    fn in_window(&self, ts: chrono::DateTime<chrono::Utc>) -> bool {
        self.window.is_none_or(|w| w.contains(ts))
    }

    fn in_focus(&self, domain: Domain) -> bool {
        self.focus.is_empty() || self.focus.contains(&domain)
    }

    /// Analyze one node; returns `None` when `cancel` was raised midway
    pub fn analyze<L: AsRef<[u8]>>(
        &self,
        node_id: &str,
        role: NodeRole,
        lines: &[L],
        metric_rows: Vec<RawMetricRow>,
        cancel: &AtomicBool,
    ) -> Option<NodeAnalysis> {
        let mut detectors = LogDetectors::new(&self.settings, node_id);
        let mut summary = RecordSummary::default();
        let mut notes = Vec::new();

        let mut records = self.parser.parse(node_id, role, lines);
        for record in records.by_ref() {
            if record.line_number % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                tracing::debug!("Node {}: cancelled at line {}", node_id, record.line_number);
                return None;
            }
            if !self.in_window(record.timestamp) {
                continue;
            }
            summary.observe(&record);
            detectors.observe(&record);
        }

        let stats = records.stats();
        if stats.headerless > 0 {
            notes.push(DataQualityError::HeaderlessLines {
                node_id: node_id.to_string(),
                headerless: stats.headerless,
            });
        }
        if stats.epoch_fallback {
            notes.push(DataQualityError::NoTimestamp { node_id: node_id.to_string() });
        }

        let mut findings = detectors.finish();

        let loaded = MetricSeriesLoader::load(node_id, metric_rows);
        notes.extend(loaded.notes);
        for mut series in loaded.series {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            series.samples.retain(|s| self.in_window(s.timestamp));
            findings.extend(analyzer::detect_metric_series(&self.settings, &series));
        }

        findings.retain(|f| self.in_focus(f.domain()));

        for note in &notes {
            tracing::debug!("Data quality: {}", note);
        }
        tracing::debug!(
            "Node {}: {} records, {} findings, {} notes",
            node_id,
            summary.total_records(),
            findings.len(),
            notes.len()
        );

        Some(NodeAnalysis { node_id: node_id.to_string(), findings, summary, notes })
    }
}
