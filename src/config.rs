use clap::Args;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::services::log_analyzer::models::{Domain, TimeWindow};
use crate::services::log_analyzer::parser::core::TimestampParser;

/// Upper bound for every duration setting
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Fatal configuration problems, reported before any processing starts
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),

    #[error("unknown domain tag '{0}'")]
    UnknownDomain(String),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
    pub thresholds: ThresholdConfig,
    pub rate_spike: RateSpikeConfig,
    pub trend: TrendConfig,
    pub error_burst: ErrorBurstConfig,
    pub ranking: RankingConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Pipeline scope and resource limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum evidence references kept per finding (default: 50)
    pub max_evidence: usize,
    /// Time budget for one node's fetch + parse + detect (default: 5m)
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub node_task_budget_secs: u64,
    /// Node units processed in parallel (default: 8)
    pub max_concurrent_nodes: usize,
    /// Optional analysis window start ("2025-09-12 16:00:00" or RFC 3339)
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    /// Only report findings for these domains (empty = all)
    pub focus_domains: Vec<Domain>,
    /// Only analyze these node ids (empty = all)
    pub target_nodes: Vec<String>,
}

/// Threshold for a numeric field extracted from one log domain
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LogFieldThreshold {
    pub domain: Domain,
    pub field: String,
    pub limit: f64,
    /// Breach at `value >= limit` instead of `value > limit`
    #[serde(default)]
    pub inclusive: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricThreshold {
    pub metric: String,
    pub limit: f64,
    #[serde(default)]
    pub inclusive: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Breaches closer than this belong to the same episode (default: 5m)
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub episode_gap_secs: u64,
    pub log_fields: Vec<LogFieldThreshold>,
    pub metrics: Vec<MetricThreshold>,
    /// Metric name → domain its anomalies are attributed to
    pub metric_domains: BTreeMap<String, Domain>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateSpikeConfig {
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub window_secs: u64,
    pub multiplier: f64,
    pub baseline_windows: usize,
    pub min_baseline_windows: usize,
    pub min_events: u64,
}

/// Numeric log field tracked for trend degradation
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrendField {
    pub domain: Domain,
    pub field: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub window_secs: u64,
    /// Consecutive increasing windows required (K)
    pub min_windows: usize,
    /// Minimum increase per window, in percent of the previous average
    pub min_slope_pct: f64,
    pub log_fields: Vec<TrendField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ErrorBurstConfig {
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub window_secs: u64,
    /// ERROR/FATAL count that must be exceeded within one window
    pub min_count: u64,
}

/// Upstream → downstream causal edge
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CascadeEdge {
    pub upstream: Domain,
    pub downstream: Domain,
    pub bonus: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub top_n: usize,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub merge_tolerance_secs: u64,
    pub evidence_weight: f64,
    pub node_weight: f64,
    pub severity_weight: f64,
    /// Domain tag → severity weight; unlisted domains weigh 1.0
    pub domain_weights: BTreeMap<String, f64>,
    pub cascades: Vec<CascadeEdge>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SourcesConfig {
    pub log_dir: Option<String>,
    pub metrics_dir: Option<String>,
}

/// Command line arguments for configuration overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// Logging level (overrides config file, e.g., "info,hbase_insight=debug")
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Directory with node log files (overrides config file)
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<String>,

    /// Directory with Grafana metric exports (overrides config file)
    #[arg(long, value_name = "DIR", global = true)]
    pub metrics_dir: Option<String>,

    /// Analysis window start (e.g., "2025-09-12 16:00:00")
    #[arg(long, value_name = "TIME", global = true)]
    pub window_start: Option<String>,

    /// Analysis window end
    #[arg(long, value_name = "TIME", global = true)]
    pub window_end: Option<String>,

    /// Number of hypotheses to report
    #[arg(long, value_name = "N", global = true)]
    pub top_n: Option<usize>,

    /// Per-node time budget (e.g., "90s", "5m")
    #[arg(long, value_name = "DURATION", global = true)]
    pub node_budget: Option<String>,

    /// Focus domains, comma separated (e.g., "WAL,GC")
    #[arg(long, value_name = "DOMAINS", value_delimiter = ',', global = true)]
    pub focus: Vec<String>,

    /// Target node ids, comma separated (e.g., "ip-10-25-130-219")
    #[arg(long, value_name = "NODES", value_delimiter = ',', global = true)]
    pub nodes: Vec<String>,
}

impl Config {
    /// Load configuration with command line, environment variable, and file support
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (prefixed with APP_)
    /// 3. Configuration file (config.toml)
    /// 4. Default values
    pub fn load(args: &ConfigArgs) -> Result<Self, anyhow::Error> {
        let config_path = args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides()?;
        config.apply_cli_overrides(args)?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_LOG_LEVEL, APP_LOG_FILE
    /// - APP_LOG_DIR, APP_METRICS_DIR: raw data directories
    /// - APP_WINDOW_START, APP_WINDOW_END: analysis window
    /// - APP_TOP_N: number of hypotheses (default: 3)
    /// - APP_NODE_TASK_BUDGET: per-node budget (accepts "90s", "5m")
    /// - APP_MAX_CONCURRENT_NODES
    /// - APP_FOCUS_DOMAINS, APP_TARGET_NODES: comma separated lists
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    fn apply_env_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(level) = lookup("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Some(file) = lookup("APP_LOG_FILE") {
            self.logging.file = Some(file);
            tracing::info!("Override logging.file from env");
        }

        if let Some(dir) = lookup("APP_LOG_DIR") {
            tracing::info!("Override sources.log_dir from env: {}", dir);
            self.sources.log_dir = Some(dir);
        }

        if let Some(dir) = lookup("APP_METRICS_DIR") {
            tracing::info!("Override sources.metrics_dir from env: {}", dir);
            self.sources.metrics_dir = Some(dir);
        }

        if let Some(start) = lookup("APP_WINDOW_START") {
            tracing::info!("Override analysis.window_start from env: {}", start);
            self.analysis.window_start = Some(start);
        }

        if let Some(end) = lookup("APP_WINDOW_END") {
            tracing::info!("Override analysis.window_end from env: {}", end);
            self.analysis.window_end = Some(end);
        }

        if let Some(top_n) = lookup("APP_TOP_N") {
            self.ranking.top_n = parse_count("APP_TOP_N", &top_n)?;
            tracing::info!("Override ranking.top_n from env: {}", self.ranking.top_n);
        }

        if let Some(budget) = lookup("APP_NODE_TASK_BUDGET") {
            self.analysis.node_task_budget_secs = parse_duration_to_secs(&budget)
                .map_err(|e| ConfigError::Invalid(format!("APP_NODE_TASK_BUDGET '{}': {}", budget, e)))?;
            tracing::info!(
                "Override analysis.node_task_budget_secs from env: {}",
                self.analysis.node_task_budget_secs
            );
        }

        if let Some(limit) = lookup("APP_MAX_CONCURRENT_NODES") {
            self.analysis.max_concurrent_nodes = parse_count("APP_MAX_CONCURRENT_NODES", &limit)?;
            tracing::info!(
                "Override analysis.max_concurrent_nodes from env: {}",
                self.analysis.max_concurrent_nodes
            );
        }

        if let Some(domains) = lookup("APP_FOCUS_DOMAINS") {
            self.analysis.focus_domains = parse_domain_list(&domains)
                .map_err(|e| ConfigError::Invalid(format!("APP_FOCUS_DOMAINS '{}': {}", domains, e)))?;
            tracing::info!("Override analysis.focus_domains from env: {}", domains);
        }

        if let Some(nodes) = lookup("APP_TARGET_NODES") {
            self.analysis.target_nodes = split_list(&nodes);
            tracing::info!("Override analysis.target_nodes from env: {}", nodes);
        }

        Ok(())
    }

    /// Apply command line argument overrides (highest priority)
    fn apply_cli_overrides(&mut self, args: &ConfigArgs) -> Result<(), ConfigError> {
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
            tracing::info!("Override logging.level from CLI: {}", self.logging.level);
        }

        if let Some(dir) = &args.log_dir {
            self.sources.log_dir = Some(dir.clone());
            tracing::info!("Override sources.log_dir from CLI: {}", dir);
        }

        if let Some(dir) = &args.metrics_dir {
            self.sources.metrics_dir = Some(dir.clone());
            tracing::info!("Override sources.metrics_dir from CLI: {}", dir);
        }

        if let Some(start) = &args.window_start {
            self.analysis.window_start = Some(start.clone());
            tracing::info!("Override analysis.window_start from CLI: {}", start);
        }

        if let Some(end) = &args.window_end {
            self.analysis.window_end = Some(end.clone());
            tracing::info!("Override analysis.window_end from CLI: {}", end);
        }

        if let Some(top_n) = args.top_n {
            self.ranking.top_n = top_n;
            tracing::info!("Override ranking.top_n from CLI: {}", top_n);
        }

        if let Some(budget) = &args.node_budget {
            self.analysis.node_task_budget_secs = parse_duration_to_secs(budget)
                .map_err(|e| ConfigError::Invalid(format!("--node-budget '{}': {}", budget, e)))?;
            tracing::info!(
                "Override analysis.node_task_budget_secs from CLI: {}",
                self.analysis.node_task_budget_secs
            );
        }

        if !args.focus.is_empty() {
            self.analysis.focus_domains = parse_domain_list(&args.focus.join(","))
                .map_err(|e| ConfigError::Invalid(format!("--focus {:?}: {}", args.focus, e)))?;
            tracing::info!("Override analysis.focus_domains from CLI: {:?}", args.focus);
        }

        if !args.nodes.is_empty() {
            self.analysis.target_nodes = args.nodes.clone();
            tracing::info!("Override analysis.target_nodes from CLI: {:?}", args.nodes);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analysis;
        ensure(a.max_evidence > 0, "analysis.max_evidence must be > 0")?;
        ensure(a.node_task_budget_secs > 0, "analysis.node_task_budget_secs must be > 0")?;
        ensure_duration(a.node_task_budget_secs, "analysis.node_task_budget_secs")?;
        ensure(a.max_concurrent_nodes > 0, "analysis.max_concurrent_nodes must be > 0")?;
        self.analysis_window()?;

        let t = &self.thresholds;
        ensure(t.episode_gap_secs > 0, "thresholds.episode_gap_secs must be > 0")?;
        ensure_duration(t.episode_gap_secs, "thresholds.episode_gap_secs")?;
        for rule in &t.log_fields {
            ensure(!rule.field.is_empty(), "thresholds.log_fields: field cannot be empty")?;
            ensure_finite(rule.limit, &format!("thresholds.log_fields[{}].limit", rule.field))?;
        }
        for rule in &t.metrics {
            ensure(!rule.metric.is_empty(), "thresholds.metrics: metric cannot be empty")?;
            ensure_finite(rule.limit, &format!("thresholds.metrics[{}].limit", rule.metric))?;
        }

        let r = &self.rate_spike;
        ensure(r.window_secs > 0, "rate_spike.window_secs must be > 0")?;
        ensure_duration(r.window_secs, "rate_spike.window_secs")?;
        ensure(r.multiplier.is_finite() && r.multiplier > 0.0, "rate_spike.multiplier must be > 0")?;
        ensure(r.baseline_windows > 0, "rate_spike.baseline_windows must be > 0")?;
        ensure(
            r.min_baseline_windows > 0 && r.min_baseline_windows <= r.baseline_windows,
            "rate_spike.min_baseline_windows must be within 1..=baseline_windows",
        )?;

        let tr = &self.trend;
        ensure(tr.window_secs > 0, "trend.window_secs must be > 0")?;
        ensure_duration(tr.window_secs, "trend.window_secs")?;
        ensure(tr.min_windows > 0, "trend.min_windows must be > 0")?;
        ensure(
            tr.min_slope_pct.is_finite() && tr.min_slope_pct >= 0.0,
            "trend.min_slope_pct must be a non-negative number",
        )?;

        ensure(self.error_burst.window_secs > 0, "error_burst.window_secs must be > 0")?;
        ensure_duration(self.error_burst.window_secs, "error_burst.window_secs")?;
        ensure(self.error_burst.min_count > 0, "error_burst.min_count must be > 0")?;

        let rk = &self.ranking;
        ensure(rk.top_n > 0, "ranking.top_n must be > 0")?;
        ensure_duration(rk.merge_tolerance_secs, "ranking.merge_tolerance_secs")?;
        for (name, weight) in [
            ("evidence_weight", rk.evidence_weight),
            ("node_weight", rk.node_weight),
            ("severity_weight", rk.severity_weight),
        ] {
            ensure(weight.is_finite() && weight >= 0.0, &format!("ranking.{} must be >= 0", name))?;
        }
        self.domain_weights()?;
        for edge in &rk.cascades {
            ensure(
                edge.upstream != edge.downstream,
                &format!("ranking.cascades: self-edge on {}", edge.upstream),
            )?;
            ensure(
                edge.bonus.is_finite() && edge.bonus >= 0.0,
                &format!("ranking.cascades: bonus for {} → {} must be >= 0", edge.upstream, edge.downstream),
            )?;
        }

        Ok(())
    }

    /// Parsed analysis window, if one is configured
    pub fn analysis_window(&self) -> Result<Option<TimeWindow>, ConfigError> {
        let parse = |label: &str, value: &Option<String>| {
            value
                .as_deref()
                .map(|v| {
                    TimestampParser::parse(v)
                        .map_err(|_| ConfigError::Invalid(format!("analysis.{} '{}' is not a timestamp", label, v)))
                })
                .transpose()
        };
        let start = parse("window_start", &self.analysis.window_start)?;
        let end = parse("window_end", &self.analysis.window_end)?;

        match (start, end) {
            (None, None) => Ok(None),
            (Some(s), Some(e)) if s > e => {
                Err(ConfigError::Invalid("analysis.window_start is after window_end".into()))
            },
            (s, e) => Ok(Some(TimeWindow {
                start: s.unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC),
                end: e.unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC),
            })),
        }
    }

    /// Domain weights resolved to domain tags
    pub fn domain_weights(&self) -> Result<BTreeMap<Domain, f64>, ConfigError> {
        self.ranking
            .domain_weights
            .iter()
            .map(|(tag, weight)| {
                let domain: Domain =
                    tag.parse().map_err(|_| ConfigError::UnknownDomain(tag.clone()))?;
                ensure(
                    weight.is_finite() && *weight >= 0.0,
                    &format!("ranking.domain_weights.{} must be >= 0", tag),
                )?;
                Ok((domain, *weight))
            })
            .collect()
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, anyhow::Error> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,hbase_insight=debug".to_string(), file: None }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_evidence: 50,
            node_task_budget_secs: 300,
            max_concurrent_nodes: 8,
            window_start: None,
            window_end: None,
            focus_domains: Vec::new(),
            target_nodes: Vec::new(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let field = |domain, field: &str, limit| LogFieldThreshold {
            domain,
            field: field.to_string(),
            limit,
            inclusive: false,
        };
        Self {
            episode_gap_secs: 300,
            log_fields: vec![
                field(Domain::Wal, "sync_duration_ms", 200.0),
                field(Domain::Gc, "pause_ms", 1000.0),
                field(Domain::Memory, "heap_usage_pct", 90.0),
                field(Domain::Flush, "duration_ms", 10_000.0),
                field(Domain::Compaction, "duration_ms", 600_000.0),
                field(Domain::Performance, "duration_ms", 10_000.0),
                field(Domain::Replication, "lag_ms", 300_000.0),
            ],
            metrics: vec![MetricThreshold {
                metric: "rpc_handler_active".to_string(),
                limit: 58.0,
                inclusive: true,
            }],
            metric_domains: [
                ("rpc_handler_active", Domain::RpcHandler),
                ("rpc_queue_length", Domain::RpcHandler),
                ("wal_sync_ms", Domain::Wal),
                ("gc_pause_ms", Domain::Gc),
                ("heap_used_pct", Domain::Memory),
                ("replication_lag_ms", Domain::Replication),
                ("request_latency_ms", Domain::Performance),
            ]
            .into_iter()
            .map(|(name, domain)| (name.to_string(), domain))
            .collect(),
        }
    }
}

impl Default for RateSpikeConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            multiplier: 3.0,
            baseline_windows: 5,
            min_baseline_windows: 3,
            min_events: 10,
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        let field = |domain, field: &str| TrendField { domain, field: field.to_string() };
        Self {
            window_secs: 60,
            min_windows: 3,
            min_slope_pct: 10.0,
            log_fields: vec![
                field(Domain::Wal, "sync_duration_ms"),
                field(Domain::Gc, "pause_ms"),
                field(Domain::Performance, "duration_ms"),
                field(Domain::Replication, "log_queue_size"),
            ],
        }
    }
}

impl Default for ErrorBurstConfig {
    fn default() -> Self {
        Self { window_secs: 60, min_count: 20 }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        let edge = |upstream, downstream, bonus| CascadeEdge { upstream, downstream, bonus };
        Self {
            top_n: 3,
            merge_tolerance_secs: 300,
            evidence_weight: 1.0,
            node_weight: 0.5,
            severity_weight: 1.0,
            domain_weights: [
                ("WAL", 1.5),
                ("GC", 1.5),
                ("MEMORY", 1.5),
                ("RPC_HANDLER", 1.2),
                ("REPLICATION", 1.2),
                ("TIMEOUT_RETRY", 1.0),
                ("NETWORK", 1.0),
                ("TABLE", 0.5),
                ("UNCLASSIFIED", 0.5),
            ]
            .into_iter()
            .map(|(tag, w)| (tag.to_string(), w))
            .collect(),
            cascades: vec![
                edge(Domain::ClientConnection, Domain::RpcHandler, 2.0),
                edge(Domain::ClientConnection, Domain::TimeoutRetry, 1.5),
                edge(Domain::RpcHandler, Domain::TimeoutRetry, 2.0),
                edge(Domain::Gc, Domain::RpcHandler, 2.0),
                edge(Domain::Gc, Domain::TimeoutRetry, 1.5),
                edge(Domain::Wal, Domain::RpcHandler, 1.5),
                edge(Domain::Memory, Domain::Gc, 2.0),
                edge(Domain::Compaction, Domain::Wal, 1.0),
                edge(Domain::Flush, Domain::Wal, 1.0),
                edge(Domain::Network, Domain::TimeoutRetry, 1.5),
                edge(Domain::Split, Domain::Balancer, 1.0),
                edge(Domain::Replication, Domain::Wal, 1.0),
            ],
        }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn ensure(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition { Ok(()) } else { Err(ConfigError::Invalid(message.to_string())) }
}

fn ensure_finite(value: f64, label: &str) -> Result<(), ConfigError> {
    ensure(value.is_finite(), &format!("{} must be a finite number", label))
}

fn ensure_duration(secs: u64, label: &str) -> Result<(), ConfigError> {
    ensure(secs <= MAX_DURATION_SECS, &format!("{} must be at most {}s (30 days)", label, MAX_DURATION_SECS))
}

fn parse_count(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} '{}' is not a number", key, value)))
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_domain_list(input: &str) -> Result<Vec<Domain>, String> {
    split_list(input).iter().map(|s| s.parse()).collect()
}

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as seconds)
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(n * 60),
        "h" | "hr" | "hour" | "hours" => Ok(n * 60 * 60),
        "d" | "day" | "days" => Ok(n * 60 * 60 * 24),
        _ => Err(format!("unsupported unit: {}", unit)),
    }
}

// Custom serde deserializer to support numeric or human-friendly string values
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '30s', '5m', '1h'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}
