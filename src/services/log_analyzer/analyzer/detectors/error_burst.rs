//! ERROR_BURST: too many ERROR/FATAL records inside a sliding window

use crate::config::ErrorBurstConfig;
use crate::services::log_analyzer::models::{EvidenceBuffer, EvidenceRef, TimeWindow};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct BurstEpisode {
    pub window: TimeWindow,
    /// Highest count seen inside one sliding window
    pub peak: u64,
    pub evidence: EvidenceBuffer,
}

#[derive(Debug, Clone)]
pub struct ErrorBurstTracker {
    window: Duration,
    min_count: u64,
    cap: usize,
    /// Errors inside the sliding window, tagged with their arrival sequence
    recent: VecDeque<(u64, DateTime<Utc>, EvidenceRef)>,
    next_seq: u64,
    /// First sequence number not yet attributed to any episode
    unclaimed_from: u64,
    open: Option<BurstEpisode>,
}

impl ErrorBurstTracker {
    pub fn new(config: &ErrorBurstConfig, cap: usize) -> Self {
        Self {
            window: super::delta_secs(config.window_secs),
            min_count: config.min_count,
            cap,
            recent: VecDeque::new(),
            next_seq: 0,
            unclaimed_from: 0,
            open: None,
        }
    }

    /// Record one error; timestamps must be non-decreasing
    pub fn observe(&mut self, ts: DateTime<Utc>, evidence: EvidenceRef) -> Option<BurstEpisode> {
        while self.recent.front().is_some_and(|(_, first, _)| ts - *first > self.window) {
            self.recent.pop_front();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.recent.push_back((seq, ts, evidence));

        let in_window = self.recent.len() as u64;
        if in_window <= self.min_count {
            return self.open.take();
        }

        match self.open.as_mut() {
            Some(episode) => {
                if let Some((_, _, latest)) = self.recent.back() {
                    episode.evidence.push(latest.clone());
                }
                episode.window.end = ts;
                episode.peak = episode.peak.max(in_window);
            },
            None => {
                // Errors already reported by the previous episode stay with it
                let mut evidence = EvidenceBuffer::new(self.cap);
                let mut start = ts;
                for (_, first, r) in self.recent.iter().filter(|(s, _, _)| *s >= self.unclaimed_from) {
                    start = start.min(*first);
                    evidence.push(r.clone());
                }
                self.open = Some(BurstEpisode {
                    window: TimeWindow::new(start, ts),
                    peak: in_window,
                    evidence,
                });
            },
        }
        self.unclaimed_from = seq + 1;
        None
    }

    pub fn finish(&mut self) -> Option<BurstEpisode> {
        self.recent.clear();
        self.open.take()
    }
}
