//! TREND_DEGRADATION: window averages that keep rising
//!
//! A run is K consecutive window-to-window increases, each at least
//! `min_slope_pct` percent above the previous average. An empty window
//! breaks the run.

use crate::config::TrendConfig;
use crate::services::log_analyzer::models::{EvidenceBuffer, EvidenceRef, TimeWindow};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
struct TrendBucket {
    index: i64,
    sum: f64,
    count: u64,
    evidence: EvidenceBuffer,
}

impl TrendBucket {
    fn average(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum / self.count as f64 }
    }
}

/// A rising run of window averages
#[derive(Debug, Clone)]
pub struct TrendRun {
    pub window: TimeWindow,
    pub first_avg: f64,
    pub last_avg: f64,
    pub steps: usize,
    pub evidence: EvidenceBuffer,
}

impl TrendRun {
    /// Relative rise over the run in percent
    pub fn increase_pct(&self) -> f64 {
        if self.first_avg.abs() > f64::EPSILON {
            (self.last_avg - self.first_avg) / self.first_avg.abs() * 100.0
        } else {
            self.last_avg - self.first_avg
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrendTracker {
    window_secs: i64,
    min_windows: usize,
    min_slope_pct: f64,
    cap: usize,
    current: Option<TrendBucket>,
    previous: Option<TrendBucket>,
    run: Option<TrendRun>,
}

impl TrendTracker {
    pub fn new(config: &TrendConfig, cap: usize) -> Self {
        Self {
            window_secs: i64::try_from(config.window_secs.max(1)).unwrap_or(i64::MAX),
            min_windows: config.min_windows,
            min_slope_pct: config.min_slope_pct,
            cap,
            current: None,
            previous: None,
            run: None,
        }
    }

    /// Add one value; timestamps must be non-decreasing
    pub fn observe(
        &mut self,
        ts: DateTime<Utc>,
        value: f64,
        evidence: EvidenceRef,
    ) -> Option<TrendRun> {
        let index = ts.timestamp().div_euclid(self.window_secs);
        let closed = self
            .current
            .take_if(|c| c.index < index)
            .and_then(|bucket| self.close_bucket(bucket));

        let cap = self.cap;
        let bucket = self.current.get_or_insert_with(|| TrendBucket {
            index,
            sum: 0.0,
            count: 0,
            evidence: EvidenceBuffer::new(cap),
        });
        bucket.sum += value;
        bucket.count += 1;
        bucket.evidence.push(evidence);

        closed
    }

    pub fn finish(&mut self) -> Option<TrendRun> {
        let closed = self.current.take().and_then(|bucket| self.close_bucket(bucket));
        closed.or_else(|| self.end_run())
    }

    fn close_bucket(&mut self, bucket: TrendBucket) -> Option<TrendRun> {
        let avg = bucket.average();
        let Some(prev) = self.previous.take() else {
            self.previous = Some(bucket);
            return None;
        };

        let adjacent = prev.index + 1 == bucket.index;
        let prev_avg = prev.average();
        let required = prev_avg.abs() * self.min_slope_pct / 100.0;
        let rising = adjacent && avg > prev_avg && avg - prev_avg >= required;

        if !rising {
            self.previous = Some(bucket);
            return self.end_run();
        }

        let start = self.bucket_start(prev.index);
        let end = super::add_clamped(
            self.bucket_start(bucket.index),
            super::delta_secs(self.window_secs.unsigned_abs()),
        );
        let cap = self.cap;
        let run = self.run.get_or_insert_with(|| {
            let mut evidence = EvidenceBuffer::new(cap);
            evidence.absorb(prev.evidence.clone());
            TrendRun {
                window: TimeWindow::new(start, end),
                first_avg: prev_avg,
                last_avg: prev_avg,
                steps: 0,
                evidence,
            }
        });
        run.steps += 1;
        run.last_avg = avg;
        run.window.end = end;
        run.evidence.absorb(bucket.evidence.clone());

        self.previous = Some(bucket);
        None
    }

    fn end_run(&mut self) -> Option<TrendRun> {
        self.run.take().filter(|run| run.steps >= self.min_windows)
    }

    fn bucket_start(&self, index: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(index * self.window_secs, 0).unwrap_or_default()
    }
}
