//! RATE_SPIKE: event counts per tumbling window against a trailing baseline
//!
//! Spiking windows are kept out of the baseline so a sustained storm stays
//! one episode instead of becoming the new normal.

use crate::config::RateSpikeConfig;
use crate::services::log_analyzer::models::{EvidenceBuffer, EvidenceRef, TimeWindow};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct Bucket {
    index: i64,
    count: u64,
    evidence: EvidenceBuffer,
}

/// Consecutive spiking windows
#[derive(Debug, Clone)]
pub struct SpikeEpisode {
    pub window: TimeWindow,
    pub peak_ratio: f64,
    pub peak_count: u64,
    pub evidence: EvidenceBuffer,
}

#[derive(Debug, Clone)]
pub struct RateSpikeTracker {
    config: RateSpikeConfig,
    window_secs: i64,
    cap: usize,
    current: Option<Bucket>,
    baseline: VecDeque<u64>,
    open: Option<SpikeEpisode>,
}

impl RateSpikeTracker {
    pub fn new(config: &RateSpikeConfig, cap: usize) -> Self {
        Self {
            config: config.clone(),
            window_secs: i64::try_from(config.window_secs.max(1)).unwrap_or(i64::MAX),
            cap,
            current: None,
            baseline: VecDeque::with_capacity(config.baseline_windows + 1),
            open: None,
        }
    }

    /// Count one event; timestamps must be non-decreasing
    pub fn observe(&mut self, ts: DateTime<Utc>, evidence: EvidenceRef) -> Option<SpikeEpisode> {
        let index = ts.timestamp().div_euclid(self.window_secs);
        let mut closed = None;

        if let Some(current) = self.current.take_if(|c| c.index < index) {
            let last_index = current.index;
            closed = self.close_bucket(current);
            // Empty windows in between are zero-count baseline windows
            let gap = (index - last_index - 1).min(self.config.baseline_windows as i64 + 1);
            for offset in 1..=gap {
                let empty = Bucket {
                    index: last_index + offset,
                    count: 0,
                    evidence: EvidenceBuffer::new(0),
                };
                closed = closed.or(self.close_bucket(empty));
            }
        }

        let cap = self.cap;
        let bucket = self.current.get_or_insert_with(|| Bucket {
            index,
            count: 0,
            evidence: EvidenceBuffer::new(cap),
        });
        bucket.count += 1;
        bucket.evidence.push(evidence);

        closed
    }

    pub fn finish(&mut self) -> Option<SpikeEpisode> {
        let closed = self.current.take().and_then(|c| self.close_bucket(c));
        closed.or_else(|| self.open.take())
    }

    fn close_bucket(&mut self, bucket: Bucket) -> Option<SpikeEpisode> {
        let n = self.baseline.len();
        let mean = if n == 0 { 0.0 } else { self.baseline.iter().sum::<u64>() as f64 / n as f64 };
        let spiking = n >= self.config.min_baseline_windows
            && bucket.count >= self.config.min_events
            && bucket.count as f64 > self.config.multiplier * mean;

        if spiking {
            let ratio = if mean > 0.0 { bucket.count as f64 / mean } else { bucket.count as f64 };
            let start = self.bucket_start(bucket.index);
            let end = super::add_clamped(start, super::delta_secs(self.window_secs.unsigned_abs()));
            let cap = self.cap;
            let episode = self.open.get_or_insert_with(|| SpikeEpisode {
                window: TimeWindow::new(start, end),
                peak_ratio: ratio,
                peak_count: bucket.count,
                evidence: EvidenceBuffer::new(cap),
            });
            episode.window.end = end;
            episode.peak_ratio = episode.peak_ratio.max(ratio);
            episode.peak_count = episode.peak_count.max(bucket.count);
            episode.evidence.absorb(bucket.evidence);
            return None;
        }

        self.baseline.push_back(bucket.count);
        while self.baseline.len() > self.config.baseline_windows {
            self.baseline.pop_front();
        }
        self.open.take()
    }

    fn bucket_start(&self, index: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(index * self.window_secs, 0).unwrap_or_default()
    }
}
