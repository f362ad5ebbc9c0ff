//! Detection thresholds
//!
//! Resolves the configured limits into lookup tables keyed the way the
//! detectors query them: by log domain for record fields and by metric name
//! for series.

use crate::config::{Config, ErrorBurstConfig, RateSpikeConfig, ThresholdConfig, TrendConfig};
use crate::services::log_analyzer::models::Domain;
use std::collections::{BTreeMap, HashMap};

/// A single limit; `inclusive` breaches at equality
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limit {
    pub limit: f64,
    pub inclusive: bool,
}

impl Limit {
    pub fn breached_by(&self, value: f64) -> bool {
        if self.inclusive { value >= self.limit } else { value > self.limit }
    }

    pub fn operator(&self) -> &'static str {
        if self.inclusive { ">=" } else { ">" }
    }
}

/// Limit bound to a named field of a log domain
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: String,
    pub limit: Limit,
}

#[derive(Debug, Clone, Default)]
pub struct DetectionThresholds {
    log_fields: HashMap<Domain, Vec<FieldRule>>,
    metrics: HashMap<String, Limit>,
    metric_domains: BTreeMap<String, Domain>,
    pub episode_gap_secs: u64,
}

impl DetectionThresholds {
    pub fn from_config(config: &ThresholdConfig) -> Self {
        let mut log_fields: HashMap<Domain, Vec<FieldRule>> = HashMap::new();
        for rule in &config.log_fields {
            log_fields.entry(rule.domain).or_default().push(FieldRule {
                field: rule.field.clone(),
                limit: Limit { limit: rule.limit, inclusive: rule.inclusive },
            });
        }

        let metrics = config
            .metrics
            .iter()
            .map(|m| (m.metric.clone(), Limit { limit: m.limit, inclusive: m.inclusive }))
            .collect();

        Self {
            log_fields,
            metrics,
            metric_domains: config.metric_domains.clone(),
            episode_gap_secs: config.episode_gap_secs,
        }
    }

    pub fn log_field_rules(&self, domain: Domain) -> &[FieldRule] {
        self.log_fields.get(&domain).map_or(&[], Vec::as_slice)
    }

    pub fn metric_limit(&self, metric: &str) -> Option<Limit> {
        self.metrics.get(metric).copied()
    }

    /// Domain a metric's anomalies are attributed to; unmapped metrics are UNCLASSIFIED
    pub fn metric_domain(&self, metric: &str) -> Domain {
        self.metric_domains.get(metric).copied().unwrap_or(Domain::Unclassified)
    }
}

/// Everything the detectors need, resolved once per run
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub max_evidence: usize,
    pub thresholds: DetectionThresholds,
    pub rate_spike: RateSpikeConfig,
    pub trend: TrendConfig,
    pub error_burst: ErrorBurstConfig,
    trend_fields: HashMap<Domain, Vec<String>>,
}

impl DetectorSettings {
    pub fn from_config(config: &Config) -> Self {
        let mut trend_fields: HashMap<Domain, Vec<String>> = HashMap::new();
        for f in &config.trend.log_fields {
            trend_fields.entry(f.domain).or_default().push(f.field.clone());
        }
        Self {
            max_evidence: config.analysis.max_evidence,
            thresholds: DetectionThresholds::from_config(&config.thresholds),
            rate_spike: config.rate_spike.clone(),
            trend: config.trend.clone(),
            error_burst: config.error_burst.clone(),
            trend_fields,
        }
    }

    pub fn trend_fields(&self, domain: Domain) -> &[String] {
        self.trend_fields.get(&domain).map_or(&[], Vec::as_slice)
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
