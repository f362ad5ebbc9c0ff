//! Data models for cluster log and metric analysis
//!
//! Records, samples, findings and hypotheses flowing through the
//! parse → classify → detect → rank pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Domains, Roles, Severity
// ============================================================================

/// Technical domain a log record or finding belongs to.
///
/// Declaration order is classifier priority order (most specific first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Domain {
    Wal,
    Gc,
    Memory,
    Replication,
    TimeoutRetry,
    RpcHandler,
    Compaction,
    Split,
    Flush,
    Balancer,
    ClientConnection,
    Network,
    Performance,
    Table,
    Unclassified,
}

impl Domain {
    /// The fourteen classified domains in priority order
    pub const ALL: [Domain; 14] = [
        Domain::Wal,
        Domain::Gc,
        Domain::Memory,
        Domain::Replication,
        Domain::TimeoutRetry,
        Domain::RpcHandler,
        Domain::Compaction,
        Domain::Split,
        Domain::Flush,
        Domain::Balancer,
        Domain::ClientConnection,
        Domain::Network,
        Domain::Performance,
        Domain::Table,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Wal => "WAL",
            Domain::Gc => "GC",
            Domain::Memory => "MEMORY",
            Domain::Replication => "REPLICATION",
            Domain::TimeoutRetry => "TIMEOUT_RETRY",
            Domain::RpcHandler => "RPC_HANDLER",
            Domain::Compaction => "COMPACTION",
            Domain::Split => "SPLIT",
            Domain::Flush => "FLUSH",
            Domain::Balancer => "BALANCER",
            Domain::ClientConnection => "CLIENT_CONNECTION",
            Domain::Network => "NETWORK",
            Domain::Performance => "PERFORMANCE",
            Domain::Table => "TABLE",
            Domain::Unclassified => "UNCLASSIFIED",
        }
    }

    /// Human-readable label used in hypothesis titles
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Wal => "WAL sync latency",
            Domain::Gc => "JVM garbage collection pauses",
            Domain::Memory => "heap / memstore pressure",
            Domain::Replication => "replication backlog",
            Domain::TimeoutRetry => "client timeouts and retries",
            Domain::RpcHandler => "RPC handler saturation",
            Domain::Compaction => "compaction pressure",
            Domain::Split => "region split activity",
            Domain::Flush => "memstore flush pressure",
            Domain::Balancer => "region balancing churn",
            Domain::ClientConnection => "client connection storm",
            Domain::Network => "network connectivity errors",
            Domain::Performance => "slow request processing",
            Domain::Table => "table DDL activity",
            Domain::Unclassified => "unclassified errors",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Domain::ALL
            .iter()
            .chain(std::iter::once(&Domain::Unclassified))
            .find(|d| d.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown domain tag: {}", s))
    }
}

/// Role of the process that produced a log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    #[serde(rename = "MASTER")]
    Master,
    #[serde(rename = "REGIONSERVER")]
    RegionServer,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Master => f.write_str("MASTER"),
            NodeRole::RegionServer => f.write_str("REGIONSERVER"),
        }
    }
}

/// Log level parsed from the line header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Unknown,
}

impl Severity {
    pub fn from_level(level: &str) -> Self {
        match level.to_ascii_uppercase().as_str() {
            "FATAL" | "CRITICAL" => Severity::Fatal,
            "ERROR" => Severity::Error,
            "WARN" | "WARNING" => Severity::Warn,
            "INFO" => Severity::Info,
            "DEBUG" => Severity::Debug,
            "TRACE" => Severity::Trace,
            _ => Severity::Unknown,
        }
    }

    /// ERROR and FATAL records feed burst detection
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Fatal | Severity::Error)
    }
}

// ============================================================================
// Log Records
// ============================================================================

/// Typed value extracted by a domain classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Bool(_) | FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// Ordered field map so serialized records are deterministic
pub type FieldMap = BTreeMap<String, FieldValue>;

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub node_id: String,
    pub node_role: NodeRole,
    /// 1-based position in the node's input
    pub line_number: u64,
    pub timestamp: DateTime<Utc>,
    pub domain: Domain,
    pub severity: Severity,
    pub raw_text: String,
    pub extracted_fields: FieldMap,
}

impl LogRecord {
    pub fn field_f64(&self, name: &str) -> Option<f64> {
        self.extracted_fields.get(name).and_then(FieldValue::as_f64)
    }

    pub fn evidence_ref(&self) -> EvidenceRef {
        EvidenceRef::Log {
            node_id: self.node_id.clone(),
            line_number: self.line_number,
            timestamp: self.timestamp,
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// One point of a per-node metric series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub node_id: String,
    pub metric_name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl MetricSample {
    pub fn evidence_ref(&self) -> EvidenceRef {
        EvidenceRef::Metric {
            node_id: self.node_id.clone(),
            metric_name: self.metric_name.clone(),
            timestamp: self.timestamp,
            value: self.value,
        }
    }
}

// ============================================================================
// Findings
// ============================================================================

/// Closed time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end < start { Self { start: end, end: start } } else { Self { start, end } }
    }

    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Smallest window covering both
    pub fn union(&self, other: &TimeWindow) -> TimeWindow {
        TimeWindow { start: self.start.min(other.start), end: self.end.max(other.end) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    ThresholdBreach,
    RateSpike,
    TrendDegradation,
    ErrorBurst,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnomalyKind::ThresholdBreach => "THRESHOLD_BREACH",
            AnomalyKind::RateSpike => "RATE_SPIKE",
            AnomalyKind::TrendDegradation => "TREND_DEGRADATION",
            AnomalyKind::ErrorBurst => "ERROR_BURST",
        };
        f.write_str(s)
    }
}

/// Reference to a record or sample backing a finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EvidenceRef {
    Log { node_id: String, line_number: u64, timestamp: DateTime<Utc> },
    Metric { node_id: String, metric_name: String, timestamp: DateTime<Utc>, value: f64 },
}

impl EvidenceRef {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EvidenceRef::Log { timestamp, .. } | EvidenceRef::Metric { timestamp, .. } => *timestamp,
        }
    }
}

/// Capped evidence collector keeping the true total
#[derive(Debug, Clone)]
pub struct EvidenceBuffer {
    cap: usize,
    total: u64,
    refs: Vec<EvidenceRef>,
}

impl EvidenceBuffer {
    pub fn new(cap: usize) -> Self {
        Self { cap, total: 0, refs: Vec::new() }
    }

    pub fn push(&mut self, evidence: EvidenceRef) {
        self.total += 1;
        if self.refs.len() < self.cap {
            self.refs.push(evidence);
        }
    }

    /// Absorb another buffer, still respecting this buffer's cap
    pub fn absorb(&mut self, other: EvidenceBuffer) {
        let room = self.cap.saturating_sub(self.refs.len());
        self.total += other.total;
        self.refs.extend(other.refs.into_iter().take(room));
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// An anomaly detected for one domain on one node.
///
/// Only constructed through [`AnomalyFinding::new`], which refuses empty
/// evidence, and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyFinding {
    domain: Domain,
    node_id: String,
    window: TimeWindow,
    kind: AnomalyKind,
    magnitude: f64,
    evidence_count: u64,
    supporting_records: Vec<EvidenceRef>,
    detail: String,
}

impl AnomalyFinding {
    /// Returns `None` when the evidence buffer is empty
    pub fn new(
        domain: Domain,
        node_id: impl Into<String>,
        window: TimeWindow,
        kind: AnomalyKind,
        magnitude: f64,
        evidence: EvidenceBuffer,
        detail: impl Into<String>,
    ) -> Option<Self> {
        if evidence.is_empty() {
            return None;
        }
        Some(Self {
            domain,
            node_id: node_id.into(),
            window,
            kind,
            magnitude,
            evidence_count: evidence.total,
            supporting_records: evidence.refs,
            detail: detail.into(),
        })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
    pub fn window(&self) -> TimeWindow {
        self.window
    }
    pub fn kind(&self) -> AnomalyKind {
        self.kind
    }
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }
    pub fn evidence_count(&self) -> u64 {
        self.evidence_count
    }
    pub fn supporting_records(&self) -> &[EvidenceRef] {
        &self.supporting_records
    }
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Earliest timestamp among the referenced evidence, or the window start
    pub fn earliest_evidence(&self) -> DateTime<Utc> {
        self.supporting_records
            .iter()
            .map(EvidenceRef::timestamp)
            .min()
            .map_or(self.window.start, |ts| ts.min(self.window.start))
    }
}

// ============================================================================
// Hypotheses and Report
// ============================================================================

/// One line of a hypothesis' evidence summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// What was counted (anomaly kind, "nodes", "cascade")
    pub metric: String,
    pub count: u64,
    pub description: String,
}

/// A ranked causal explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalHypothesis {
    pub rank: usize,
    pub title: String,
    pub primary_domain: Domain,
    /// Primary domain first, then suspected upstream domains
    pub domain_set: Vec<Domain>,
    pub score: f64,
    pub base_score: f64,
    pub cascade_bonus: f64,
    pub window: TimeWindow,
    pub nodes: Vec<String>,
    pub total_evidence: u64,
    pub kinds: Vec<AnomalyKind>,
    pub upstream_domains: Vec<Domain>,
    pub evidence_summary: Vec<EvidenceItem>,
}

/// A node whose analysis did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialNode {
    pub node_id: String,
    pub reason: String,
}

/// Error category assigned by keyword, for the error summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    Memory,
    Network,
    Io,
    Permission,
    Configuration,
    Data,
    Resource,
    Fatal,
    Error,
    Warning,
    Exception,
    Unknown,
}

/// Record counts by domain, node and hour of day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub total_records: u64,
    pub by_domain: BTreeMap<Domain, u64>,
    pub by_node: BTreeMap<String, BTreeMap<Domain, u64>>,
    /// Hour of day (UTC) → record count
    pub hourly_distribution: BTreeMap<u32, u64>,
    /// Most frequent classified domains, descending
    pub top_domains: Vec<(Domain, u64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub total: u64,
    pub by_category: BTreeMap<ErrorCategory, u64>,
    pub top_categories: Vec<(ErrorCategory, u64)>,
}

/// Final output of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub run_id: Uuid,
    pub window: Option<TimeWindow>,
    pub nodes_processed: usize,
    pub total_records: u64,
    pub anomalies_found: usize,
    pub partial_nodes: Vec<PartialNode>,
    pub hypotheses: Vec<CausalHypothesis>,
    pub event_summary: EventSummary,
    pub error_summary: ErrorSummary,
    pub data_quality_notes: u64,
}
