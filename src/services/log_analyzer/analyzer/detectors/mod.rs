//! Streaming anomaly detectors
//!
//! Each tracker keeps only the state of its current window or open episode,
//! so a node's records are examined in one pass without buffering.
//!
//! - `threshold`: per (domain, field) and per metric limits
//! - `rate_spike`: per domain event counts against a trailing baseline
//! - `trend`: rising window averages of numeric fields and metrics
//! - `error_burst`: ERROR/FATAL records per domain in a sliding window

pub mod error_burst;
pub mod rate_spike;
pub mod threshold;
pub mod trend;

pub use error_burst::{BurstEpisode, ErrorBurstTracker};
pub use rate_spike::{RateSpikeTracker, SpikeEpisode};
pub use threshold::{BreachEpisode, ThresholdTracker};
pub use trend::{TrendRun, TrendTracker};

use super::thresholds::{DetectorSettings, Limit};
use crate::services::log_analyzer::metrics::MetricSeries;
use crate::services::log_analyzer::models::{AnomalyFinding, AnomalyKind, Domain, LogRecord};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

// ============================================================================
// Time arithmetic
// ============================================================================

/// Configured seconds as a delta; saturates instead of panicking
pub(crate) fn delta_secs(secs: u64) -> Duration {
    i64::try_from(secs).ok().and_then(Duration::try_seconds).unwrap_or(Duration::MAX)
}

/// `ts + delta`, clamped to the latest representable instant
pub(crate) fn add_clamped(ts: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    ts.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ============================================================================
// Finding construction
// ============================================================================

fn breach_finding(
    domain: Domain,
    node_id: &str,
    subject: &str,
    limit: Limit,
    episode: BreachEpisode,
) -> Option<AnomalyFinding> {
    let magnitude =
        if limit.limit.abs() > f64::EPSILON { episode.peak / limit.limit } else { episode.peak };
    let detail = format!(
        "{} peaked at {} ({} {})",
        subject,
        episode.peak,
        limit.operator(),
        limit.limit
    );
    AnomalyFinding::new(
        domain,
        node_id,
        episode.window,
        AnomalyKind::ThresholdBreach,
        magnitude,
        episode.evidence,
        detail,
    )
}

fn spike_finding(domain: Domain, node_id: &str, episode: SpikeEpisode) -> Option<AnomalyFinding> {
    let detail = format!(
        "{} events peaked at {} per window ({:.1}x baseline)",
        domain, episode.peak_count, episode.peak_ratio
    );
    AnomalyFinding::new(
        domain,
        node_id,
        episode.window,
        AnomalyKind::RateSpike,
        episode.peak_ratio,
        episode.evidence,
        detail,
    )
}

fn trend_finding(
    domain: Domain,
    node_id: &str,
    subject: &str,
    run: TrendRun,
) -> Option<AnomalyFinding> {
    let increase = run.increase_pct();
    let detail = format!(
        "{} rose from {:.1} to {:.1} over {} windows (+{:.0}%)",
        subject, run.first_avg, run.last_avg, run.steps, increase
    );
    AnomalyFinding::new(
        domain,
        node_id,
        run.window,
        AnomalyKind::TrendDegradation,
        increase,
        run.evidence,
        detail,
    )
}

fn burst_finding(domain: Domain, node_id: &str, episode: BurstEpisode) -> Option<AnomalyFinding> {
    let detail = format!("{} errors peaked at {} within one window", domain, episode.peak);
    AnomalyFinding::new(
        domain,
        node_id,
        episode.window,
        AnomalyKind::ErrorBurst,
        episode.peak as f64,
        episode.evidence,
        detail,
    )
}

/// Stable order for one node's findings
fn sort_findings(findings: &mut [AnomalyFinding]) {
    findings.sort_by(|a, b| {
        a.domain()
            .cmp(&b.domain())
            .then(a.window().start.cmp(&b.window().start))
            .then(a.kind().cmp(&b.kind()))
            .then(a.detail().cmp(b.detail()))
    });
}

// ============================================================================
// Log Detectors
// ============================================================================

/// All log-side detectors of one node.
///
/// Trackers are created lazily the first time a (domain, field) pair shows
/// up. Timestamps that step backwards are clamped to the latest seen, since
/// inherited timestamps can lag the true order of interleaved writers.
pub struct LogDetectors<'a> {
    settings: &'a DetectorSettings,
    node_id: String,
    last_ts: Option<DateTime<Utc>>,
    thresholds: BTreeMap<(Domain, usize), ThresholdTracker>,
    spikes: BTreeMap<Domain, RateSpikeTracker>,
    trends: BTreeMap<(Domain, usize), TrendTracker>,
    bursts: BTreeMap<Domain, ErrorBurstTracker>,
    findings: Vec<AnomalyFinding>,
}

impl<'a> LogDetectors<'a> {
    pub fn new(settings: &'a DetectorSettings, node_id: impl Into<String>) -> Self {
        Self {
            settings,
            node_id: node_id.into(),
            last_ts: None,
            thresholds: BTreeMap::new(),
            spikes: BTreeMap::new(),
            trends: BTreeMap::new(),
            bursts: BTreeMap::new(),
            findings: Vec::new(),
        }
    }

    pub fn observe(&mut self, record: &LogRecord) {
        let ts = self.last_ts.map_or(record.timestamp, |last| last.max(record.timestamp));
        self.last_ts = Some(ts);

        let settings = self.settings;
        let domain = record.domain;
        let cap = settings.max_evidence;

        for (idx, rule) in settings.thresholds.log_field_rules(domain).iter().enumerate() {
            let Some(value) = record.field_f64(&rule.field) else {
                continue;
            };
            let tracker = self.thresholds.entry((domain, idx)).or_insert_with(|| {
                ThresholdTracker::new(rule.limit, settings.thresholds.episode_gap_secs, cap)
            });
            if let Some(episode) = tracker.observe(ts, value, || record.evidence_ref()) {
                let subject = format!("{}.{}", domain, rule.field);
                self.findings
                    .extend(breach_finding(domain, &self.node_id, &subject, rule.limit, episode));
            }
        }

        for (idx, field) in settings.trend_fields(domain).iter().enumerate() {
            let Some(value) = record.field_f64(field) else {
                continue;
            };
            let tracker = self
                .trends
                .entry((domain, idx))
                .or_insert_with(|| TrendTracker::new(&settings.trend, cap));
            if let Some(run) = tracker.observe(ts, value, record.evidence_ref()) {
                let subject = format!("{}.{}", domain, field);
                self.findings.extend(trend_finding(domain, &self.node_id, &subject, run));
            }
        }

        if domain != Domain::Unclassified {
            let tracker = self
                .spikes
                .entry(domain)
                .or_insert_with(|| RateSpikeTracker::new(&settings.rate_spike, cap));
            if let Some(episode) = tracker.observe(ts, record.evidence_ref()) {
                self.findings.extend(spike_finding(domain, &self.node_id, episode));
            }
        }

        if record.severity.is_error() {
            let tracker = self
                .bursts
                .entry(domain)
                .or_insert_with(|| ErrorBurstTracker::new(&settings.error_burst, cap));
            if let Some(episode) = tracker.observe(ts, record.evidence_ref()) {
                self.findings.extend(burst_finding(domain, &self.node_id, episode));
            }
        }
    }

    /// Close every open episode and return the node's findings
    pub fn finish(mut self) -> Vec<AnomalyFinding> {
        let settings = self.settings;
        let node_id = self.node_id.as_str();

        for ((domain, idx), tracker) in self.thresholds.iter_mut() {
            let rules = settings.thresholds.log_field_rules(*domain);
            if let (Some(episode), Some(rule)) = (tracker.finish(), rules.get(*idx)) {
                let subject = format!("{}.{}", domain, rule.field);
                self.findings.extend(breach_finding(*domain, node_id, &subject, rule.limit, episode));
            }
        }

        for ((domain, idx), tracker) in self.trends.iter_mut() {
            let fields = settings.trend_fields(*domain);
            if let (Some(run), Some(field)) = (tracker.finish(), fields.get(*idx)) {
                let subject = format!("{}.{}", domain, field);
                self.findings.extend(trend_finding(*domain, node_id, &subject, run));
            }
        }

        for (domain, tracker) in self.spikes.iter_mut() {
            if let Some(episode) = tracker.finish() {
                self.findings.extend(spike_finding(*domain, node_id, episode));
            }
        }

        for (domain, tracker) in self.bursts.iter_mut() {
            if let Some(episode) = tracker.finish() {
                self.findings.extend(burst_finding(*domain, node_id, episode));
            }
        }

        sort_findings(&mut self.findings);
        self.findings
    }
}

// ============================================================================
// Metric Detection
// ============================================================================

/// Threshold and trend detection over one metric series
pub fn detect_metric_series(settings: &DetectorSettings, series: &MetricSeries) -> Vec<AnomalyFinding> {
    let domain = settings.thresholds.metric_domain(&series.metric_name);
    let node_id = series.node_id.as_str();
    let subject = series.metric_name.as_str();
    let cap = settings.max_evidence;
    let mut findings = Vec::new();

    let mut breach = settings.thresholds.metric_limit(subject).map(|limit| {
        ThresholdTracker::new(limit, settings.thresholds.episode_gap_secs, cap)
    });
    let mut trend = TrendTracker::new(&settings.trend, cap);

    for sample in &series.samples {
        if let Some(tracker) = breach.as_mut()
            && let Some(episode) =
                tracker.observe(sample.timestamp, sample.value, || sample.evidence_ref())
        {
            findings.extend(breach_finding(domain, node_id, subject, tracker.limit(), episode));
        }
        if let Some(run) = trend.observe(sample.timestamp, sample.value, sample.evidence_ref()) {
            findings.extend(trend_finding(domain, node_id, subject, run));
        }
    }

    if let Some(tracker) = breach.as_mut()
        && let Some(episode) = tracker.finish()
    {
        findings.extend(breach_finding(domain, node_id, subject, tracker.limit(), episode));
    }
    if let Some(run) = trend.finish() {
        findings.extend(trend_finding(domain, node_id, subject, run));
    }

    sort_findings(&mut findings);
    findings
}
