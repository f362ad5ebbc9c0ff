//! Error types for the analysis pipeline

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ConfigError;

/// Recoverable input problems.
///
/// The offending line becomes UNCLASSIFIED or the row is dropped; the note is
/// counted in the report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataQualityError {
    #[error("node {node_id}: no parseable timestamp in input, falling back to the Unix epoch")]
    NoTimestamp { node_id: String },

    #[error("node {node_id}: {headerless} line(s) without a parseable header")]
    HeaderlessLines { node_id: String, headerless: u64 },

    #[error("node {node_id}: duplicate sample for {metric_name} at {timestamp}, last value wins")]
    DuplicateSample { node_id: String, metric_name: String, timestamp: DateTime<Utc> },

    #[error("node {node_id}: non-finite value for {metric_name} at {timestamp} dropped")]
    NonFiniteValue { node_id: String, metric_name: String, timestamp: DateTime<Utc> },

    #[error("malformed metric export: {0}")]
    MalformedExport(String),
}

/// Failure of an external collaborator (topology or raw data)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Fatal pipeline errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("cluster topology is missing: {0}")]
    MissingTopology(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
