//! Metric series loader
//!
//! Normalizes raw per-node metric rows into per-(node, metric) series ordered
//! by timestamp. Duplicate timestamps keep the last loaded value; non-finite
//! values are dropped. Both produce a data-quality note.

use crate::services::log_analyzer::error::DataQualityError;
use crate::services::log_analyzer::models::MetricSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One raw metric row as delivered by a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetricRow {
    pub metric_name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl RawMetricRow {
    pub fn new(metric_name: impl Into<String>, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { metric_name: metric_name.into(), timestamp, value }
    }
}

/// Time-ordered samples of one metric on one node
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub node_id: String,
    pub metric_name: String,
    pub samples: Vec<MetricSample>,
}

/// Loader output: series sorted by metric name, plus notes
#[derive(Debug, Clone, Default)]
pub struct LoadedMetrics {
    pub series: Vec<MetricSeries>,
    pub notes: Vec<DataQualityError>,
}

pub struct MetricSeriesLoader;

impl MetricSeriesLoader {
    pub fn load(node_id: &str, rows: Vec<RawMetricRow>) -> LoadedMetrics {
        let mut notes = Vec::new();
        let mut grouped: BTreeMap<String, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();

        for row in rows {
            if !row.value.is_finite() {
                notes.push(DataQualityError::NonFiniteValue {
                    node_id: node_id.to_string(),
                    metric_name: row.metric_name,
                    timestamp: row.timestamp,
                });
                continue;
            }
            grouped.entry(row.metric_name).or_default().push((row.timestamp, row.value));
        }

        let mut series = Vec::with_capacity(grouped.len());
        for (metric_name, mut points) in grouped {
            // Stable: equal timestamps stay in load order, so the last one is the newest
            points.sort_by_key(|(ts, _)| *ts);

            let mut samples: Vec<MetricSample> = Vec::with_capacity(points.len());
            for (timestamp, value) in points {
                match samples.last_mut() {
                    Some(prev) if prev.timestamp == timestamp => {
                        prev.value = value;
                        notes.push(DataQualityError::DuplicateSample {
                            node_id: node_id.to_string(),
                            metric_name: metric_name.clone(),
                            timestamp,
                        });
                    },
                    _ => samples.push(MetricSample {
                        node_id: node_id.to_string(),
                        metric_name: metric_name.clone(),
                        timestamp,
                        value,
                    }),
                }
            }

            series.push(MetricSeries { node_id: node_id.to_string(), metric_name, samples });
        }

        for note in &notes {
            tracing::warn!("{}", note);
        }

        LoadedMetrics { series, notes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_757_692_800 + secs, 0).unwrap()
    }

    #[test]
    fn test_sorts_out_of_order_rows() {
        let rows = vec![
            RawMetricRow::new("handler", ts(60), 2.0),
            RawMetricRow::new("handler", ts(0), 1.0),
            RawMetricRow::new("handler", ts(120), 3.0),
        ];
        let loaded = MetricSeriesLoader::load("n1", rows);
        let values: Vec<f64> = loaded.series[0].samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert!(loaded.notes.is_empty());
    }

    #[test]
    fn test_duplicate_timestamp_last_wins() {
        let rows = vec![
            RawMetricRow::new("handler", ts(0), 1.0),
            RawMetricRow::new("handler", ts(0), 9.0),
            RawMetricRow::new("handler", ts(0), 5.0),
        ];
        let loaded = MetricSeriesLoader::load("n1", rows);
        assert_eq!(loaded.series[0].samples.len(), 1);
        assert_eq!(loaded.series[0].samples[0].value, 5.0);
        assert_eq!(loaded.notes.len(), 2);
    }

    #[test]
    fn test_non_finite_dropped() {
        let rows = vec![
            RawMetricRow::new("a", ts(0), f64::NAN),
            RawMetricRow::new("a", ts(1), 1.0),
            RawMetricRow::new("b", ts(0), f64::INFINITY),
        ];
        let loaded = MetricSeriesLoader::load("n1", rows);
        assert_eq!(loaded.series.len(), 1);
        assert_eq!(loaded.series[0].metric_name, "a");
        assert_eq!(loaded.notes.len(), 2);
    }
}
