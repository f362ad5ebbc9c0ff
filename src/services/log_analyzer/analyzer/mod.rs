//! Log analyzer module
//!
//! Streaming anomaly detection per node and cross-node root cause ranking.

pub mod detectors;
pub mod root_cause;
pub mod summary;
pub mod thresholds;

pub use detectors::{LogDetectors, detect_metric_series};
pub use root_cause::RootCauseRanker;
pub use summary::{RecordSummary, classify_error};
pub use thresholds::{DetectionThresholds, DetectorSettings, FieldRule, Limit};
