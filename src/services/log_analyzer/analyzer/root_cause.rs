//! Root cause ranking
//!
//! Folds the findings of all nodes into per-domain candidates, scores them,
//! credits downstream candidates for plausible upstream triggers and emits
//! the top-N as ranked hypotheses.
//!
//! ```text
//! findings ─▶ group by domain ─▶ merge close windows ─▶ base score
//!                                                         │
//!                    top-N ◀─ total order ◀─ cascade bonus ┘
//! ```

use super::detectors;
use crate::config::{CascadeEdge, Config, ConfigError};
use crate::services::log_analyzer::models::{
    AnomalyFinding, AnomalyKind, CausalHypothesis, Domain, EvidenceItem, TimeWindow,
};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Weight of domains missing from the configured table
const DEFAULT_DOMAIN_WEIGHT: f64 = 1.0;

/// Nodes listed by name in the evidence summary before eliding
const MAX_LISTED_NODES: usize = 5;

// ============================================================================
// Candidates
// ============================================================================

/// Findings of one domain whose windows chain together
struct Candidate<'f> {
    domain: Domain,
    window: TimeWindow,
    findings: Vec<&'f AnomalyFinding>,
}

impl Candidate<'_> {
    fn total_evidence(&self) -> u64 {
        self.findings.iter().map(|f| f.evidence_count()).sum()
    }

    fn nodes(&self) -> BTreeSet<&str> {
        self.findings.iter().map(|f| f.node_id()).collect()
    }

    fn earliest(&self) -> DateTime<Utc> {
        self.findings
            .iter()
            .map(|f| f.earliest_evidence())
            .min()
            .unwrap_or(self.window.start)
    }
}

/// Hypothesis plus the key fields of the total order not carried in it
struct Scored {
    earliest: DateTime<Utc>,
    hypothesis: CausalHypothesis,
}

// ============================================================================
// Ranker
// ============================================================================

#[derive(Debug, Clone)]
pub struct RootCauseRanker {
    top_n: usize,
    merge_tolerance: Duration,
    evidence_weight: f64,
    node_weight: f64,
    severity_weight: f64,
    domain_weights: BTreeMap<Domain, f64>,
    cascades: Vec<CascadeEdge>,
}

impl RootCauseRanker {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let r = &config.ranking;
        Ok(Self {
            top_n: r.top_n,
            merge_tolerance: detectors::delta_secs(r.merge_tolerance_secs),
            evidence_weight: r.evidence_weight,
            node_weight: r.node_weight,
            severity_weight: r.severity_weight,
            domain_weights: config.domain_weights()?,
            cascades: r.cascades.clone(),
        })
    }

    /// Rank findings into at most `top_n` hypotheses; empty input gives an empty list
    pub fn rank(&self, findings: &[AnomalyFinding]) -> Vec<CausalHypothesis> {
        if findings.is_empty() {
            return Vec::new();
        }

        let candidates = self.build_candidates(findings);
        let base_scores: Vec<f64> = candidates.iter().map(|c| self.base_score(c)).collect();

        let mut scored: Vec<Scored> = candidates
            .iter()
            .zip(&base_scores)
            .map(|(candidate, base)| self.build_hypothesis(candidate, *base, &candidates))
            .collect();

        scored.sort_by(Self::total_order);

        let total = scored.len();
        let hypotheses: Vec<CausalHypothesis> = scored
            .into_iter()
            .take(self.top_n)
            .enumerate()
            .map(|(i, s)| CausalHypothesis { rank: i + 1, ..s.hypothesis })
            .collect();

        tracing::debug!(
            "Ranked {} candidates from {} findings, kept {}",
            total,
            findings.len(),
            hypotheses.len()
        );
        hypotheses
    }

    /// Step 1: per domain, merge findings whose windows chain within the tolerance
    fn build_candidates<'f>(&self, findings: &'f [AnomalyFinding]) -> Vec<Candidate<'f>> {
        let mut by_domain: BTreeMap<Domain, Vec<&AnomalyFinding>> = BTreeMap::new();
        for finding in findings {
            by_domain.entry(finding.domain()).or_default().push(finding);
        }

        let mut candidates = Vec::new();
        for (domain, mut group) in by_domain {
            group.sort_by(|a, b| {
                a.window()
                    .start
                    .cmp(&b.window().start)
                    .then(a.window().end.cmp(&b.window().end))
                    .then(a.node_id().cmp(b.node_id()))
                    .then(a.kind().cmp(&b.kind()))
                    .then(a.detail().cmp(b.detail()))
            });

            let mut current: Option<Candidate> = None;
            for finding in group {
                let chained = current.as_ref().is_some_and(|c| {
                    finding.window().start <= detectors::add_clamped(c.window.end, self.merge_tolerance)
                });
                if chained && let Some(c) = current.as_mut() {
                    c.window = c.window.union(&finding.window());
                    c.findings.push(finding);
                } else {
                    candidates.extend(current.take());
                    current = Some(Candidate {
                        domain,
                        window: finding.window(),
                        findings: vec![finding],
                    });
                }
            }
            candidates.extend(current);
        }
        candidates
    }

    /// Step 2: evidence volume, spread and domain severity
    fn base_score(&self, candidate: &Candidate) -> f64 {
        let evidence = candidate.total_evidence() as f64;
        let nodes = candidate.nodes().len() as f64;
        let weight =
            self.domain_weights.get(&candidate.domain).copied().unwrap_or(DEFAULT_DOMAIN_WEIGHT);
        self.evidence_weight * evidence.ln_1p() + self.node_weight * nodes + self.severity_weight * weight
    }

    /// Earliest candidate of `upstream` that starts strictly before `downstream`
    /// and ends no more than the tolerance before it starts
    fn find_trigger<'c, 'f>(
        &self,
        upstream: Domain,
        downstream: &Candidate,
        candidates: &'c [Candidate<'f>],
    ) -> Option<&'c Candidate<'f>> {
        candidates
            .iter()
            .filter(|a| a.domain == upstream)
            .filter(|a| {
                a.window.start < downstream.window.start
                    && downstream.window.start <= detectors::add_clamped(a.window.end, self.merge_tolerance)
            })
            .min_by_key(|a| a.window.start)
    }

    /// Steps 3 and 4: cascade credit and the hypothesis body
    fn build_hypothesis(
        &self,
        candidate: &Candidate,
        base_score: f64,
        candidates: &[Candidate],
    ) -> Scored {
        let mut evidence_summary = Self::kind_items(candidate);

        let nodes: Vec<String> = candidate.nodes().into_iter().map(str::to_string).collect();
        evidence_summary.push(EvidenceItem {
            metric: "nodes".to_string(),
            count: nodes.len() as u64,
            description: Self::describe_nodes(&nodes),
        });

        let mut cascade_bonus = 0.0;
        let mut upstream_domains: Vec<Domain> = Vec::new();
        for edge in self.cascades.iter().filter(|e| e.downstream == candidate.domain) {
            if upstream_domains.contains(&edge.upstream) {
                continue;
            }
            let Some(trigger) = self.find_trigger(edge.upstream, candidate, candidates) else {
                continue;
            };
            cascade_bonus += edge.bonus;
            upstream_domains.push(edge.upstream);
            evidence_summary.push(EvidenceItem {
                metric: "cascade".to_string(),
                count: trigger.total_evidence(),
                description: format!(
                    "suspected upstream trigger {} ({}) starting {}, +{:.2}",
                    edge.upstream,
                    edge.upstream.label(),
                    trigger.window.start.format("%Y-%m-%d %H:%M:%S"),
                    edge.bonus
                ),
            });
        }

        let mut domain_set = vec![candidate.domain];
        domain_set.extend(upstream_domains.iter().copied());

        let title = if upstream_domains.is_empty() {
            format!("{} ({})", capitalize(candidate.domain.label()), candidate.domain)
        } else {
            let causes: Vec<&str> = upstream_domains.iter().map(|d| d.label()).collect();
            format!(
                "{} ({}) following {}",
                capitalize(candidate.domain.label()),
                candidate.domain,
                causes.join(" and ")
            )
        };

        let kinds: Vec<AnomalyKind> = candidate
            .findings
            .iter()
            .map(|f| f.kind())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Scored {
            earliest: candidate.earliest(),
            hypothesis: CausalHypothesis {
                rank: 0,
                title,
                primary_domain: candidate.domain,
                domain_set,
                score: base_score + cascade_bonus,
                base_score,
                cascade_bonus,
                window: candidate.window,
                nodes,
                total_evidence: candidate.total_evidence(),
                kinds,
                upstream_domains,
                evidence_summary,
            },
        }
    }

    /// One line per anomaly kind, quoting its strongest finding
    fn kind_items(candidate: &Candidate) -> Vec<EvidenceItem> {
        let mut by_kind: BTreeMap<AnomalyKind, Vec<&AnomalyFinding>> = BTreeMap::new();
        for f in &candidate.findings {
            by_kind.entry(f.kind()).or_default().push(*f);
        }

        by_kind
            .into_iter()
            .map(|(kind, group)| {
                let count = group.iter().map(|f| f.evidence_count()).sum();
                let strongest = group
                    .iter()
                    .max_by(|a, b| a.magnitude().total_cmp(&b.magnitude()))
                    .map(|f| f.detail())
                    .unwrap_or_default();
                EvidenceItem {
                    metric: kind.to_string(),
                    count,
                    description: format!("{} finding(s); strongest: {}", group.len(), strongest),
                }
            })
            .collect()
    }

    fn describe_nodes(nodes: &[String]) -> String {
        if nodes.len() <= MAX_LISTED_NODES {
            nodes.join(", ")
        } else {
            format!(
                "{} and {} more",
                nodes[..MAX_LISTED_NODES].join(", "),
                nodes.len() - MAX_LISTED_NODES
            )
        }
    }

    /// Score desc, evidence desc, domain set size desc, earliest asc, tags asc
    fn total_order(a: &Scored, b: &Scored) -> Ordering {
        let (ha, hb) = (&a.hypothesis, &b.hypothesis);
        hb.score
            .total_cmp(&ha.score)
            .then(hb.total_evidence.cmp(&ha.total_evidence))
            .then(hb.domain_set.len().cmp(&ha.domain_set.len()))
            .then(a.earliest.cmp(&b.earliest))
            .then_with(|| {
                let ta = ha.domain_set.iter().map(Domain::as_str);
                let tb = hb.domain_set.iter().map(Domain::as_str);
                ta.cmp(tb)
            })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
