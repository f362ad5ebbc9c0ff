//! THRESHOLD_BREACH: values beyond a configured limit, grouped into episodes

use super::super::thresholds::Limit;
use crate::services::log_analyzer::models::{EvidenceBuffer, EvidenceRef, TimeWindow};
use chrono::{DateTime, Duration, Utc};

/// A closed run of breaches
#[derive(Debug, Clone)]
pub struct BreachEpisode {
    pub window: TimeWindow,
    pub peak: f64,
    pub evidence: EvidenceBuffer,
}

/// Streaming breach tracker for one series
#[derive(Debug, Clone)]
pub struct ThresholdTracker {
    limit: Limit,
    gap: Duration,
    cap: usize,
    open: Option<BreachEpisode>,
}

impl ThresholdTracker {
    pub fn new(limit: Limit, episode_gap_secs: u64, cap: usize) -> Self {
        Self { limit, gap: super::delta_secs(episode_gap_secs), cap, open: None }
    }

    pub fn limit(&self) -> Limit {
        self.limit
    }

    /// Feed one value; returns an episode closed by a breach arriving too late
    pub fn observe(
        &mut self,
        ts: DateTime<Utc>,
        value: f64,
        evidence: impl FnOnce() -> EvidenceRef,
    ) -> Option<BreachEpisode> {
        if !self.limit.breached_by(value) {
            return None;
        }

        let expired = self.open.as_ref().is_some_and(|open| ts - open.window.end > self.gap);
        let closed = if expired { self.open.take() } else { None };

        let cap = self.cap;
        let episode = self.open.get_or_insert_with(|| BreachEpisode {
            window: TimeWindow::instant(ts),
            peak: value,
            evidence: EvidenceBuffer::new(cap),
        });
        episode.window.end = episode.window.end.max(ts);
        episode.peak = episode.peak.max(value);
        episode.evidence.push(evidence());

        closed
    }

    pub fn finish(&mut self) -> Option<BreachEpisode> {
        self.open.take()
    }
}
